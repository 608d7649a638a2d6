//! Filters: parameter-driven narrowing of a relation.
//!
//! A filter is constructed once, at declaration, from its options and the
//! feature it belongs to. At request time it pulls its value out of the
//! parameters ([`Filter::extract`]) and narrows the relation with it
//! ([`Filter::apply`]).
//!
//! # Built-in filters
//!
//! | kind       | parameter           | effect                                   |
//! |------------|---------------------|------------------------------------------|
//! | `min`      | `<attr>_min`        | `column >= value`                        |
//! | `max`      | `<attr>_max`        | `column <= value`                        |
//! | `search`   | `<attr>`            | `=`, `<>` or substring, per `cond`       |
//! | `text`     | `<attr>`            | case-insensitive substring               |
//! | `in`       | `<attrs>`           | `column IN (values)`                     |
//! | `since`    | `since_<attr>`      | `column > value`                         |
//! | `after`    | `after_<attr>`      | rows after a referenced row, ascending   |
//! | `paginate` | `limit`, `page`     | LIMIT/OFFSET window                      |
//!
//! Every filter but `paginate` accepts `as` (parameter name), `column_name`
//! (defaults to the attribute) and `table_name` (defaults to the relation's
//! table). Column filters also take `cast` (see [`Cast`]): parameters usually
//! arrive from a query string, so by default `"2"` binds as the integer `2`.

pub mod error;
pub mod options;
pub mod registry;

mod after;
mod bound;
mod membership;
mod paginate;
mod search;

pub use after::AfterFilter;
pub use bound::{BoundFilter, BoundKind};
pub use error::{DeclarationError, FilterOptionsError};
pub use membership::InFilter;
pub use options::FilterOptions;
pub use paginate::{PageWindow, PaginateFilter};
pub use registry::{FilterConstructor, FilterRegistry};
pub use search::{SearchCond, SearchFilter, TextFilter};

use crate::feature::Feature;
use crate::params::Params;
use crate::query::{ColumnRef, Relation};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// A configured, stateless narrowing strategy.
pub trait Filter: fmt::Debug + Send + Sync {
    /// Registry key the filter was built for, e.g. `"min"`.
    fn kind(&self) -> &str;

    /// Parameter the filter is driven by.
    fn param_key(&self) -> &str;

    /// Whether `key` is a parameter this filter consumes.
    fn reads(&self, key: &str) -> bool {
        key == self.param_key()
    }

    /// The value to apply, or `None` when the filter does not apply.
    fn extract(&self, params: &Params) -> Option<Value> {
        params.value(self.param_key()).cloned()
    }

    /// Window filters (pagination) are applied after every other filter and
    /// are left out of the total relation.
    fn is_window(&self) -> bool {
        false
    }

    fn apply(&self, relation: Relation, value: &Value) -> Relation;
}

/// How a parameter value is typed before it is bound against a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cast {
    /// Strings in canonical integer (`"42"`) or decimal (`"4.2"`) form become
    /// numbers; everything else is kept.
    #[default]
    Auto,
    /// Values are bound as given.
    Text,
    /// Numeric strings become integers.
    Integer,
    /// Numeric strings become doubles.
    Float,
}

impl Cast {
    /// Casts scalars, and the elements of a list one by one. Strings that do
    /// not parse are left for the backend to reject.
    pub fn apply(self, value: &Value) -> Value {
        match value {
            Value::Array(values) => Value::Array(values.iter().map(|v| self.apply(v)).collect()),
            Value::String(s) => self.cast_str(s).unwrap_or_else(|| value.clone()),
            other => other.clone(),
        }
    }

    fn cast_str(self, s: &str) -> Option<Value> {
        let trimmed = s.trim();
        match self {
            Cast::Text => None,
            Cast::Integer => trimmed.parse::<i64>().ok().map(Value::from),
            Cast::Float => float(trimmed),
            Cast::Auto => match trimmed.parse::<i64>() {
                Ok(n) if n.to_string() == trimmed => Some(Value::from(n)),
                Ok(_) => None,
                Err(_) if is_decimal(trimmed) => float(trimmed),
                Err(_) => None,
            },
        }
    }
}

fn float(s: &str) -> Option<Value> {
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
}

/// `-?digits.digits`, without leading zeros on the integer part.
fn is_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let Some((int, frac)) = unsigned.split_once('.') else {
        return false;
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(int) && digits(frac) && (int == "0" || !int.starts_with('0'))
}

/// Options shared by column-targeting filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnOptions {
    #[serde(rename = "as")]
    pub alias: Option<String>,
    pub column_name: Option<String>,
    pub table_name: Option<String>,
    #[serde(default)]
    pub cast: Cast,
}

/// Where a filter reads its parameter, how it types the value and which
/// column it narrows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    param_key: String,
    column: ColumnRef,
    cast: Cast,
}

impl Binding {
    pub fn new(param_key: impl Into<String>, column: ColumnRef) -> Self {
        Self {
            param_key: param_key.into(),
            column,
            cast: Cast::default(),
        }
    }

    pub fn with_cast(mut self, cast: Cast) -> Self {
        self.cast = cast;
        self
    }

    /// `default_param` unless aliased; the feature's attribute unless
    /// `column_name` is set.
    pub fn resolve(
        feature: &Feature,
        alias: Option<String>,
        column_name: Option<String>,
        table_name: Option<String>,
        default_param: impl FnOnce(&str) -> String,
    ) -> Self {
        let column = column_name.unwrap_or_else(|| feature.name().to_string());
        Self::new(
            alias.unwrap_or_else(|| default_param(feature.name())),
            ColumnRef::new(column).in_table(table_name),
        )
    }

    pub fn from_options(
        feature: &Feature,
        options: ColumnOptions,
        default_param: impl FnOnce(&str) -> String,
    ) -> Self {
        Self::resolve(
            feature,
            options.alias,
            options.column_name,
            options.table_name,
            default_param,
        )
        .with_cast(options.cast)
    }

    pub fn param_key(&self) -> &str {
        &self.param_key
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    pub fn cast(&self) -> Cast {
        self.cast
    }

    /// The present parameter value, cast for the column.
    pub fn extract(&self, params: &Params) -> Option<Value> {
        params.value(&self.param_key).map(|value| self.cast.apply(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binding_defaults_to_attribute() {
        let feature = Feature::new("created_at", "ProductsQuery");
        let binding = Binding::from_options(&feature, ColumnOptions::default(), |attr| {
            format!("{attr}_min")
        });
        assert_eq!(binding.param_key(), "created_at_min");
        assert_eq!(binding.column(), &ColumnRef::new("created_at"));
    }

    #[test]
    fn test_binding_overrides() {
        let feature = Feature::new("name", "ProductsQuery");
        let options = ColumnOptions {
            alias: Some("q".to_string()),
            column_name: Some("title".to_string()),
            table_name: Some("catalog".to_string()),
            cast: Cast::Text,
        };
        let binding = Binding::from_options(&feature, options, str::to_string);
        assert_eq!(binding.param_key(), "q");
        assert_eq!(binding.column(), &ColumnRef::qualified("catalog", "title"));
        assert_eq!(binding.cast(), Cast::Text);
    }

    #[test]
    fn test_auto_cast_takes_canonical_numbers_only() {
        assert_eq!(Cast::Auto.apply(&json!("2")), json!(2));
        assert_eq!(Cast::Auto.apply(&json!(" -7 ")), json!(-7));
        assert_eq!(Cast::Auto.apply(&json!("2.5")), json!(2.5));
        assert_eq!(Cast::Auto.apply(&json!(["1", "2", 3])), json!([1, 2, 3]));
        assert_eq!(Cast::Auto.apply(&json!("02139")), json!("02139"));
        assert_eq!(Cast::Auto.apply(&json!("1e3")), json!("1e3"));
        assert_eq!(Cast::Auto.apply(&json!("Milk")), json!("Milk"));
        assert_eq!(
            Cast::Auto.apply(&json!("2024-01-02T00:00:00Z")),
            json!("2024-01-02T00:00:00Z")
        );
    }

    #[test]
    fn test_explicit_casts() {
        assert_eq!(Cast::Text.apply(&json!("2")), json!("2"));
        assert_eq!(Cast::Integer.apply(&json!("02139")), json!(2139));
        assert_eq!(Cast::Integer.apply(&json!("x")), json!("x"));
        assert_eq!(Cast::Float.apply(&json!("1e3")), json!(1000.0));
    }

    #[test]
    fn test_binding_extract_casts_present_values() {
        let feature = Feature::new("id", "ProductsQuery");
        let binding = Binding::from_options(&feature, ColumnOptions::default(), |attr| {
            format!("{attr}_min")
        });
        let params = Params::new().with("id_min", "2");
        assert_eq!(binding.extract(&params), Some(json!(2)));
        assert_eq!(binding.extract(&Params::new().with("id_min", "")), None);
    }
}
