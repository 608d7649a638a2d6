use super::{Binding, ColumnOptions, Filter, FilterOptions, FilterOptionsError};
use crate::feature::Feature;
use crate::params::Params;
use crate::query::{Comparison, Predicate, Relation};
use serde_json::Value;
use std::sync::Arc;

/// Which side of the value a [`BoundFilter`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// `column >= value`, parameter `<attr>_min`
    Min,
    /// `column <= value`, parameter `<attr>_max`
    Max,
    /// `column > value`, parameter `since_<attr>`
    Since,
}

impl BoundKind {
    pub fn key(self) -> &'static str {
        match self {
            BoundKind::Min => "min",
            BoundKind::Max => "max",
            BoundKind::Since => "since",
        }
    }

    fn comparison(self) -> Comparison {
        match self {
            BoundKind::Min => Comparison::Gte,
            BoundKind::Max => Comparison::Lte,
            BoundKind::Since => Comparison::Gt,
        }
    }

    fn default_param(self, attribute: &str) -> String {
        match self {
            BoundKind::Min => format!("{attribute}_min"),
            BoundKind::Max => format!("{attribute}_max"),
            BoundKind::Since => format!("since_{attribute}"),
        }
    }
}

/// One-sided range bound on a column.
#[derive(Debug, Clone)]
pub struct BoundFilter {
    bound: BoundKind,
    binding: Binding,
}

impl BoundFilter {
    pub fn new(bound: BoundKind, binding: Binding) -> Self {
        Self { bound, binding }
    }

    pub fn construct(
        bound: BoundKind,
        options: &FilterOptions,
        feature: &Feature,
    ) -> Result<Arc<dyn Filter>, FilterOptionsError> {
        let options: ColumnOptions = options.parse()?;
        let binding = Binding::from_options(feature, options, |attr| bound.default_param(attr));
        Ok(Arc::new(Self::new(bound, binding)))
    }

    pub fn bound(&self) -> BoundKind {
        self.bound
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }
}

impl Filter for BoundFilter {
    fn kind(&self) -> &str {
        self.bound.key()
    }

    fn param_key(&self) -> &str {
        self.binding.param_key()
    }

    fn extract(&self, params: &Params) -> Option<Value> {
        self.binding.extract(params)
    }

    fn apply(&self, relation: Relation, value: &Value) -> Relation {
        relation.filter(Predicate::Compare {
            column: self.binding.column().clone(),
            op: self.bound.comparison(),
            value: value.clone(),
        })
    }
}
