//! Value conversion between request parameters, SeaQuery and may_postgres.
//!
//! Parameters arrive as JSON values; predicates carry them unchanged until a
//! relation is built, at which point [`json_to_value`] turns them into SeaQuery
//! values. [`with_converted_params`] then binds the built statement's values as
//! `ToSql` trait objects for `may_postgres`.

use crate::executor::LifeError;
use chrono::{DateTime, Utc};
use may_postgres::types::ToSql;
use sea_query::Value;
use serde_json::Value as Json;

/// Convert a JSON parameter to the SeaQuery value it binds as.
///
/// Integers that fit `i32` bind as `INT`, wider ones as `BIGINT`. Strings in
/// RFC 3339 form bind as `TIMESTAMPTZ`; other strings as text. Arrays and objects
/// bind as JSON.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::String(None),
        Json::Bool(b) => Value::Bool(Some(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => Value::Int(Some(small)),
                    Err(_) => Value::BigInt(Some(i)),
                }
            } else if let Some(u) = n.as_u64() {
                Value::BigUnsigned(Some(u))
            } else {
                Value::Double(n.as_f64())
            }
        }
        Json::String(s) => match parse_timestamp(s) {
            Some(ts) => Value::from(ts),
            None => Value::String(Some(s.clone())),
        },
        Json::Array(_) | Json::Object(_) => Value::from(json.clone()),
    }
}

/// RFC 3339 timestamps, normalized to UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Owned copy of one bound value; the statement's parameters borrow from these.
enum Bound {
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Null(Option<i32>),
}

impl Bound {
    fn from_value(value: &Value) -> Result<Self, LifeError> {
        Ok(match value {
            Value::Bool(Some(b)) => Bound::Bool(*b),
            Value::TinyInt(Some(i)) => Bound::Int(i32::from(*i)),
            Value::SmallInt(Some(i)) => Bound::Int(i32::from(*i)),
            Value::Int(Some(i)) => Bound::Int(*i),
            Value::BigInt(Some(i)) => Bound::BigInt(*i),
            Value::TinyUnsigned(Some(u)) => Bound::Int(i32::from(*u)),
            Value::SmallUnsigned(Some(u)) => Bound::Int(i32::from(*u)),
            Value::Unsigned(Some(u)) => Bound::BigInt(i64::from(*u)),
            Value::BigUnsigned(Some(u)) => Bound::BigInt(i64::try_from(*u).map_err(|_| {
                LifeError::Other(format!(
                    "BigUnsigned value {} exceeds i64::MAX ({}), cannot be safely cast to i64",
                    u,
                    i64::MAX
                ))
            })?),
            Value::Float(Some(f)) => Bound::Double(f64::from(*f)),
            Value::Double(Some(d)) => Bound::Double(*d),
            Value::String(Some(s)) => Bound::Text(String::clone(s)),
            Value::ChronoDateTimeUtc(Some(ts)) => Bound::Timestamp(DateTime::<Utc>::clone(ts)),
            Value::Json(Some(j)) => Bound::Text(serde_json::to_string(&**j).map_err(|e| {
                LifeError::Other(format!("Failed to serialize JSON: {}", e))
            })?),
            Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::ChronoDateTimeUtc(None)
            | Value::Json(None) => Bound::Null(None),
            _ => {
                return Err(LifeError::Other(format!(
                    "Unsupported value type in query: {:?}",
                    value
                )));
            }
        })
    }

    fn as_sql(&self) -> &dyn ToSql {
        match self {
            Bound::Bool(b) => b,
            Bound::Int(i) => i,
            Bound::BigInt(i) => i,
            Bound::Double(d) => d,
            Bound::Text(s) => s,
            Bound::Timestamp(ts) => ts,
            Bound::Null(n) => n,
        }
    }
}

/// Convert SeaQuery values to may_postgres `ToSql` parameters and run `f` with them.
///
/// Values are copied out first, then borrowed; the borrowed parameters are only
/// valid inside `f`.
///
/// # Errors
///
/// Returns `LifeError::Other` if an unsupported value type is encountered, and
/// whatever `f` returns otherwise.
pub fn with_converted_params<F, R>(values: &sea_query::Values, f: F) -> Result<R, LifeError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, LifeError>,
{
    let owned = values
        .iter()
        .map(Bound::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(Bound::as_sql).collect();
    f(&params)
}
