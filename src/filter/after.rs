use super::{Binding, Cast, Filter, FilterOptions, FilterOptionsError};
use crate::feature::Feature;
use crate::params::Params;
use crate::query::{ColumnRef, Direction, Predicate, Relation};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_KEY_COLUMN: &str = "id";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AfterOptions {
    #[serde(rename = "as")]
    alias: Option<String>,
    column_name: Option<String>,
    table_name: Option<String>,
    key_column: Option<String>,
    #[serde(default)]
    cast: Cast,
}

/// Cursor filter: rows whose column is strictly greater than the column of the
/// row identified by the parameter, in ascending order.
///
/// The parameter names a row by its key column (`id` unless `key_column` is
/// set). When no such row exists the relation is only ordered, not narrowed.
#[derive(Debug, Clone)]
pub struct AfterFilter {
    binding: Binding,
    key: ColumnRef,
}

impl AfterFilter {
    pub fn new(binding: Binding, key: ColumnRef) -> Self {
        Self { binding, key }
    }

    pub fn construct(
        options: &FilterOptions,
        feature: &Feature,
    ) -> Result<Arc<dyn Filter>, FilterOptionsError> {
        let options: AfterOptions = options.parse()?;
        let key = ColumnRef::new(
            options
                .key_column
                .unwrap_or_else(|| DEFAULT_KEY_COLUMN.to_string()),
        )
        .in_table(options.table_name.clone());
        let binding = Binding::resolve(
            feature,
            options.alias,
            options.column_name,
            options.table_name,
            |attr| format!("after_{attr}"),
        )
        .with_cast(options.cast);
        Ok(Arc::new(Self::new(binding, key)))
    }

    pub fn key(&self) -> &ColumnRef {
        &self.key
    }
}

impl Filter for AfterFilter {
    fn kind(&self) -> &str {
        "after"
    }

    fn param_key(&self) -> &str {
        self.binding.param_key()
    }

    fn extract(&self, params: &Params) -> Option<Value> {
        self.binding.extract(params)
    }

    fn apply(&self, relation: Relation, value: &Value) -> Relation {
        let column = self.binding.column().clone();
        relation
            .filter(Predicate::After {
                column: column.clone(),
                key: self.key.clone(),
                reference: value.clone(),
            })
            .order_by(column, Direction::Asc)
    }
}
