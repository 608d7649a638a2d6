use super::{Binding, ColumnOptions, Filter, FilterOptions, FilterOptionsError};
use crate::feature::Feature;
use crate::naming::pluralize;
use crate::params::Params;
use crate::query::{Predicate, Relation};
use serde_json::Value;
use std::sync::Arc;

/// Set membership; parameter is the pluralized attribute (`ids` for `id`).
///
/// A scalar parameter is treated as a one-element list.
#[derive(Debug, Clone)]
pub struct InFilter {
    binding: Binding,
}

impl InFilter {
    pub fn new(binding: Binding) -> Self {
        Self { binding }
    }

    pub fn construct(
        options: &FilterOptions,
        feature: &Feature,
    ) -> Result<Arc<dyn Filter>, FilterOptionsError> {
        let options: ColumnOptions = options.parse()?;
        Ok(Arc::new(Self::new(Binding::from_options(
            feature, options, pluralize,
        ))))
    }
}

impl Filter for InFilter {
    fn kind(&self) -> &str {
        "in"
    }

    fn param_key(&self) -> &str {
        self.binding.param_key()
    }

    fn extract(&self, params: &Params) -> Option<Value> {
        self.binding.extract(params)
    }

    fn apply(&self, relation: Relation, value: &Value) -> Relation {
        let values = match value {
            Value::Array(values) => values.clone(),
            scalar => vec![scalar.clone()],
        };
        relation.filter(Predicate::In {
            column: self.binding.column().clone(),
            values,
        })
    }
}
