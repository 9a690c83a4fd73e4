//! Type-specific condition builders.
//!
//! Every builder turns a validated [`FilterOperation`] into a `sea_orm::Condition`. Column
//! names only ever come from the [`FilterConfig`]; client values are bound parameters.

use sea_orm::sea_query::{Alias, ColumnRef, Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{Condition, Value};

use super::definition::{FilterConfig, FilterOperator, FilterType};
use super::operation::{FilterOperation, Rejection};
use super::values;
use super::zone::Timezone;

/// Builds the condition for one filter key, or says why it was dropped.
pub(crate) fn build_condition(
    config: &FilterConfig,
    op: &FilterOperation,
    tz: Timezone,
) -> Result<Condition, Rejection> {
    op.validate(config)?;

    let fields = config.fields();
    let Some(first) = fields.first() else {
        return Err(Rejection::NoFields);
    };

    match config.filter_type {
        FilterType::Id => numeric(first, op, values::id),
        FilterType::Number => numeric(first, op, values::number),
        FilterType::String => string(&fields, op),
        FilterType::Bool => boolean(first, op),
        FilterType::Date => date(first, op, tz),
        FilterType::DateTime => datetime(first, op, tz),
        FilterType::Enum => enumeration(first, op, &config.enum_values),
    }
}

/// `users.status` becomes `"users"."status"`, `status` stays a bare column.
pub(crate) fn column_ref(field: &str) -> ColumnRef {
    match field.split_once('.') {
        Some((table, column)) => (Alias::new(table), Alias::new(column)).into_column_ref(),
        None => Alias::new(field).into_column_ref(),
    }
}

fn col(field: &str) -> Expr {
    Expr::col(column_ref(field))
}

fn numeric(
    field: &str,
    op: &FilterOperation,
    parse: fn(&str) -> Result<Value, Rejection>,
) -> Result<Condition, Rejection> {
    let arity = || Rejection::WrongArity {
        operator: op.operator,
        count: op.values.len(),
    };
    let mut values = values::numbers(&op.values, parse)?.into_iter();

    let expr = match op.operator {
        FilterOperator::In => col(field).is_in(values),
        FilterOperator::NotIn => col(field).is_not_in(values),
        FilterOperator::Between => match (values.next(), values.next()) {
            (Some(low), Some(high)) => col(field).between(low, high),
            _ => return Err(arity()),
        },
        unary => {
            let value = values.next().ok_or_else(arity)?;
            match unary {
                FilterOperator::Eq => col(field).eq(value),
                FilterOperator::Neq => col(field).ne(value),
                FilterOperator::Gt => col(field).gt(value),
                FilterOperator::Gte => col(field).gte(value),
                FilterOperator::Lt => col(field).lt(value),
                FilterOperator::Lte => col(field).lte(value),
                other => return Err(Rejection::Unsupported(other)),
            }
        }
    };
    Ok(Condition::all().add(expr))
}

/// Marks the next LIKE pattern character as literal. Needs no quoting on any backend.
const LIKE_ESCAPE: char = '!';

/// Escape LIKE wildcards so the client value is matched literally.
fn escape_like_wildcards(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn string_expr(field: &str, op: &FilterOperation) -> Result<SimpleExpr, Rejection> {
    Ok(match op.operator {
        FilterOperator::Eq => col(field).eq(op.first()),
        FilterOperator::Neq => col(field).ne(op.first()),
        FilterOperator::In => col(field).is_in(op.values.iter().map(String::as_str)),
        FilterOperator::NotIn => col(field).is_not_in(op.values.iter().map(String::as_str)),
        FilterOperator::Like => {
            let pattern = format!("%{}%", escape_like_wildcards(&op.first().to_lowercase()));
            Expr::expr(Func::lower(col(field))).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
        }
        other => return Err(Rejection::Unsupported(other)),
    })
}

/// One field compares directly; several fields form a single OR group.
fn string(fields: &[String], op: &FilterOperation) -> Result<Condition, Rejection> {
    if let [field] = fields {
        return Ok(Condition::all().add(string_expr(field, op)?));
    }

    fields
        .iter()
        .try_fold(Condition::any(), |group, field| {
            Ok(group.add(string_expr(field, op)?))
        })
}

fn boolean(field: &str, op: &FilterOperation) -> Result<Condition, Rejection> {
    if op.operator != FilterOperator::Eq {
        return Err(Rejection::Unsupported(op.operator));
    }
    let value = op.first().eq_ignore_ascii_case("true");
    Ok(Condition::all().add(col(field).eq(value)))
}

/// Whole-day semantics: `eq` and `lte` extend to the last nanosecond of the day.
fn date(field: &str, op: &FilterOperation, tz: Timezone) -> Result<Condition, Rejection> {
    let expr = match op.operator {
        FilterOperator::Eq => col(field).between(
            values::start_of_day(op.first(), tz)?,
            values::end_of_day(op.first(), tz)?,
        ),
        FilterOperator::Between => col(field).between(
            values::start_of_day(&op.values[0], tz)?,
            values::end_of_day(&op.values[1], tz)?,
        ),
        FilterOperator::Gte => col(field).gte(values::start_of_day(op.first(), tz)?),
        FilterOperator::Lte => col(field).lte(values::end_of_day(op.first(), tz)?),
        other => return Err(Rejection::Unsupported(other)),
    };
    Ok(Condition::all().add(expr))
}

fn datetime(field: &str, op: &FilterOperation, tz: Timezone) -> Result<Condition, Rejection> {
    let expr = match op.operator {
        FilterOperator::Eq => col(field).eq(values::datetime(op.first(), tz)?),
        FilterOperator::Between => col(field).between(
            values::datetime(&op.values[0], tz)?,
            values::datetime(&op.values[1], tz)?,
        ),
        FilterOperator::Gte => col(field).gte(values::datetime(op.first(), tz)?),
        FilterOperator::Lte => col(field).lte(values::datetime(op.first(), tz)?),
        other => return Err(Rejection::Unsupported(other)),
    };
    Ok(Condition::all().add(expr))
}

/// Any value outside the whitelist drops the whole filter.
fn enumeration(
    field: &str,
    op: &FilterOperation,
    allowed: &[String],
) -> Result<Condition, Rejection> {
    if let Some(bad) = op.values.iter().find(|value| !allowed.contains(value)) {
        return Err(Rejection::EnumValueNotAllowed(bad.clone()));
    }

    let expr = match op.operator {
        FilterOperator::Eq => col(field).eq(op.first()),
        FilterOperator::In => col(field).is_in(op.values.iter().map(String::as_str)),
        other => return Err(Rejection::Unsupported(other)),
    };
    Ok(Condition::all().add(expr))
}
