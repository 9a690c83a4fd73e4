use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use sea_orm::Value;
use uuid::Uuid;

use super::operation::Rejection;
use super::zone::Timezone;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn number(raw: &str) -> Result<Value, Rejection> {
    let raw = raw.trim();
    if let Ok(int) = raw.parse::<i64>() {
        return Ok(int.into());
    }
    match raw.parse::<f64>() {
        Ok(float) if float.is_finite() => Ok(float.into()),
        _ => Err(Rejection::InvalidValue(raw.to_string())),
    }
}

pub(crate) fn id(raw: &str) -> Result<Value, Rejection> {
    let raw = raw.trim();
    if let Ok(int) = raw.parse::<i64>() {
        return Ok(int.into());
    }
    Uuid::parse_str(raw)
        .map(Into::into)
        .map_err(|_| Rejection::InvalidValue(raw.to_string()))
}

pub(crate) fn numbers(
    raw: &[String],
    parse: fn(&str) -> Result<Value, Rejection>,
) -> Result<Vec<Value>, Rejection> {
    raw.iter().map(|value| parse(value)).collect()
}

fn parse_date(raw: &str) -> Result<NaiveDate, Rejection> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| Rejection::InvalidValue(raw.to_string()))
}

/// The first instant of the day `raw` in `tz`, as UTC.
pub(crate) fn start_of_day(raw: &str, tz: Timezone) -> Result<DateTime<FixedOffset>, Rejection> {
    localize(parse_date(raw)?.and_time(NaiveTime::MIN), tz, raw)
}

/// The last nanosecond of the day `raw` in `tz`, as UTC. Days around a DST change are 23 or
/// 25 hours long.
pub(crate) fn end_of_day(raw: &str, tz: Timezone) -> Result<DateTime<FixedOffset>, Rejection> {
    let next = parse_date(raw)?
        .succ_opt()
        .ok_or_else(|| Rejection::InvalidValue(raw.to_string()))?;
    localize(next.and_time(NaiveTime::MIN), tz, raw).map(|start| start - TimeDelta::nanoseconds(1))
}

/// `YYYY-MM-DD HH:MM:SS` in `tz`, or RFC 3339 carrying its own offset. Returned as UTC so every
/// bound value has the same textual form as rows stored in UTC.
pub(crate) fn datetime(raw: &str, tz: Timezone) -> Result<DateTime<FixedOffset>, Rejection> {
    let trimmed = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT) {
        return localize(naive, tz, raw);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| parsed.with_timezone(&Utc).fixed_offset())
        .map_err(|_| Rejection::InvalidValue(raw.to_string()))
}

fn localize(
    naive: NaiveDateTime,
    tz: Timezone,
    raw: &str,
) -> Result<DateTime<FixedOffset>, Rejection> {
    tz.localize(naive)
        .ok_or_else(|| Rejection::InvalidValue(raw.to_string()))
}
