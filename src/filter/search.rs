use super::{Binding, Cast, ColumnOptions, Filter, FilterOptions, FilterOptionsError};
use crate::feature::Feature;
use crate::params::Params;
use crate::query::{Comparison, Predicate, Relation};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Match mode of a `search` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCond {
    #[default]
    Eq,
    NotEq,
    Like,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchOptions {
    #[serde(rename = "as")]
    alias: Option<String>,
    column_name: Option<String>,
    table_name: Option<String>,
    #[serde(default)]
    cond: SearchCond,
    #[serde(default)]
    cast: Cast,
}

/// Exact (or negated, or substring) match on a column; parameter `<attr>`.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    binding: Binding,
    cond: SearchCond,
}

impl SearchFilter {
    pub fn new(binding: Binding, cond: SearchCond) -> Self {
        Self { binding, cond }
    }

    pub fn construct(
        options: &FilterOptions,
        feature: &Feature,
    ) -> Result<Arc<dyn Filter>, FilterOptionsError> {
        let options: SearchOptions = options.parse()?;
        let binding = Binding::resolve(
            feature,
            options.alias,
            options.column_name,
            options.table_name,
            str::to_string,
        )
        .with_cast(options.cast);
        Ok(Arc::new(Self::new(binding, options.cond)))
    }

    pub fn cond(&self) -> SearchCond {
        self.cond
    }
}

impl Filter for SearchFilter {
    fn kind(&self) -> &str {
        "search"
    }

    fn param_key(&self) -> &str {
        self.binding.param_key()
    }

    /// Substring searches keep the text as typed.
    fn extract(&self, params: &Params) -> Option<Value> {
        match self.cond {
            SearchCond::Like => params.value(self.param_key()).cloned(),
            SearchCond::Eq | SearchCond::NotEq => self.binding.extract(params),
        }
    }

    fn apply(&self, relation: Relation, value: &Value) -> Relation {
        let column = self.binding.column().clone();
        let predicate = match self.cond {
            SearchCond::Eq => Predicate::Compare {
                column,
                op: Comparison::Eq,
                value: value.clone(),
            },
            SearchCond::NotEq => Predicate::Compare {
                column,
                op: Comparison::NotEq,
                value: value.clone(),
            },
            SearchCond::Like => Predicate::Contains {
                column,
                needle: text_of(value),
            },
        };
        relation.filter(predicate)
    }
}

/// Case-insensitive substring match; parameter `<attr>`.
#[derive(Debug, Clone)]
pub struct TextFilter {
    binding: Binding,
}

impl TextFilter {
    pub fn new(binding: Binding) -> Self {
        Self { binding }
    }

    pub fn construct(
        options: &FilterOptions,
        feature: &Feature,
    ) -> Result<Arc<dyn Filter>, FilterOptionsError> {
        let options: ColumnOptions = options.parse()?;
        Ok(Arc::new(Self::new(Binding::from_options(
            feature,
            options,
            str::to_string,
        ))))
    }
}

impl Filter for TextFilter {
    fn kind(&self) -> &str {
        "text"
    }

    fn param_key(&self) -> &str {
        self.binding.param_key()
    }

    fn apply(&self, relation: Relation, value: &Value) -> Relation {
        relation.filter(Predicate::Contains {
            column: self.binding.column().clone(),
            needle: text_of(value),
        })
    }
}

/// Strings as-is, anything else in its JSON form.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
