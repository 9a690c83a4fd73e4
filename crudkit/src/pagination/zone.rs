use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Zone name used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

/// The zone DATE and DATETIME filter values are read in.
///
/// Either an IANA name (`Asia/Jakarta`, `America/New_York`), which follows daylight saving
/// rules, or a fixed `±HH:MM` offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Default for Timezone {
    fn default() -> Self {
        Self::Named(Tz::Asia__Jakarta)
    }
}

impl From<Tz> for Timezone {
    fn from(tz: Tz) -> Self {
        Self::Named(tz)
    }
}

impl From<FixedOffset> for Timezone {
    fn from(offset: FixedOffset) -> Self {
        Self::Fixed(offset)
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(tz) => f.write_str(tz.name()),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTimezone(pub String);

impl fmt::Display for InvalidTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown timezone '{}'", self.0)
    }
}

impl std::error::Error for InvalidTimezone {}

impl FromStr for Timezone {
    type Err = InvalidTimezone;

    /// An IANA name first, then `Z`, `UTC`, `+07:00`, `-0530` or `+7`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Ok(tz) = trimmed.parse::<Tz>() {
            return Ok(Self::Named(tz));
        }
        parse_offset(trimmed)
            .map(Self::Fixed)
            .ok_or_else(|| InvalidTimezone(raw.to_string()))
    }
}

impl Timezone {
    /// The instant a wall-clock time in this zone refers to, expressed in UTC.
    ///
    /// Ambiguous times (a DST fold) resolve to the earlier instant. Times inside a DST gap
    /// move forward past the gap.
    #[must_use]
    pub fn localize(self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Fixed(offset) => to_utc(&offset, naive),
            Self::Named(tz) => to_utc(&tz, naive)
                .or_else(|| to_utc(&tz, naive.checked_add_signed(TimeDelta::hours(1))?)),
        }
    }
}

fn to_utc<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc).fixed_offset())
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    if !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }
    let (hours, minutes) = match rest.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
