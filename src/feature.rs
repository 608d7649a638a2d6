//! Features: declared attributes and the filters bound to them.

use crate::filter::{DeclarationError, Filter, FilterOptions, FilterRegistry};
use std::fmt;
use std::sync::Arc;

/// A declared, configured filter bound to a feature.
#[derive(Clone)]
pub struct FilterSpec {
    kind: String,
    attribute: String,
    options: FilterOptions,
    filter: Arc<dyn Filter>,
}

impl FilterSpec {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSpec")
            .field("kind", &self.kind)
            .field("attribute", &self.attribute)
            .field("param_key", &self.filter.param_key())
            .finish()
    }
}

/// A named attribute of a query definition with its ordered filter specs.
#[derive(Debug, Clone)]
pub struct Feature {
    name: String,
    query: String,
    specs: Vec<FilterSpec>,
}

impl Feature {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            specs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the definition that owns the feature.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn specs(&self) -> &[FilterSpec] {
        &self.specs
    }

    pub(crate) fn rebind(&mut self, query: &str) {
        self.query = query.to_string();
    }

    /// Resolve `kind` in `registry`, build the filter and append it.
    ///
    /// # Errors
    ///
    /// `UnknownFilterKind` when no constructor is registered under `kind`;
    /// `InvalidFilterOptions` when the constructor rejects `options`.
    pub fn create_filter(
        &mut self,
        registry: &FilterRegistry,
        kind: &str,
        options: FilterOptions,
    ) -> Result<&FilterSpec, DeclarationError> {
        let constructor =
            registry
                .lookup(kind)
                .ok_or_else(|| DeclarationError::UnknownFilterKind {
                    query: self.query.clone(),
                    kind: kind.to_string(),
                })?;

        let filter =
            constructor(&options, self).map_err(|e| DeclarationError::InvalidFilterOptions {
                query: self.query.clone(),
                feature: self.name.clone(),
                kind: kind.to_string(),
                reason: e.to_string(),
            })?;

        log::trace!(
            "{}: feature '{}' gains '{}' filter on parameter '{}'",
            self.query,
            self.name,
            kind,
            filter.param_key()
        );

        self.specs.push(FilterSpec {
            kind: kind.to_string(),
            attribute: self.name.clone(),
            options,
            filter,
        });
        Ok(&self.specs[self.specs.len() - 1])
    }
}
