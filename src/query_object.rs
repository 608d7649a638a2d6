//! Query objects: one request's parameters bound to a definition.
//!
//! Filters are applied lazily and at most once. The page relation and the
//! total relation share the non-window step; counts are memoized per object,
//! so repeated calls never hit the source twice.

use crate::definition::QueryDefinition;
use crate::executor::LifeError;
use crate::feature::FilterSpec;
use crate::filter::PageWindow;
use crate::params::Params;
use crate::query::{Relation, RelationSource};
use once_cell::unsync::OnceCell;
use serde::Serialize;
use serde_json::Value;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Pagination summary of a query object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

/// Parameters bound to a [`QueryDefinition`] over a starting relation.
///
/// # Example
///
/// ```
/// use lifequery::{MemorySource, QueryDefinition, QueryObject};
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let definition = QueryDefinition::builder("ProductsQuery")
///     .range("id")?
///     .standard_features(None, None)?
///     .build();
///
/// let source = MemorySource::new().with_records(
///     "products",
///     (0..3).map(|i| json!({ "name": format!("Sample{i}") })),
/// )?;
///
/// let query = QueryObject::new(&definition, json!({ "limit": 2, "page": 1 }), &source);
/// assert_eq!(query.count()?, 2);
/// assert_eq!(query.total_count()?, 3);
/// # Ok(())
/// # }
/// ```
pub struct QueryObject<'d, S: RelationSource> {
    definition: &'d QueryDefinition,
    params: Params,
    base: Relation,
    source: S,
    filtered: OnceCell<Relation>,
    page: OnceCell<Relation>,
    count: OnceCell<u64>,
    total_count: OnceCell<u64>,
}

impl<'d, S: RelationSource> QueryObject<'d, S> {
    /// Query over every record of the definition's table.
    pub fn new(definition: &'d QueryDefinition, params: impl Into<Params>, source: S) -> Self {
        Self::with_relation(definition, params, definition.relation(), source)
    }

    /// Query narrowing `relation` instead of the whole table.
    pub fn with_relation(
        definition: &'d QueryDefinition,
        params: impl Into<Params>,
        relation: Relation,
        source: S,
    ) -> Self {
        Self {
            params: Params::merged(definition.default_params(), &params.into()),
            definition,
            base: relation,
            source,
            filtered: OnceCell::new(),
            page: OnceCell::new(),
            count: OnceCell::new(),
            total_count: OnceCell::new(),
        }
    }

    pub fn definition(&self) -> &'d QueryDefinition {
        self.definition
    }

    /// Defaults overlaid with the supplied parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The page relation: every matching filter applied, window last.
    pub fn call(&self) -> &Relation {
        self.page.get_or_init(|| {
            let mut relation = self.total_relation().clone();
            for spec in self.window_specs() {
                if let Some(value) = spec.filter().extract(&self.params) {
                    relation = self.apply(spec, relation, &value);
                }
            }
            relation
        })
    }

    /// Every matching filter applied except the window.
    pub fn total_relation(&self) -> &Relation {
        self.filtered.get_or_init(|| {
            self.trace_ignored_params();
            let mut relation = self.base.clone();
            for spec in self.definition.specs().filter(|s| !s.filter().is_window()) {
                if let Some(value) = spec.filter().extract(&self.params) {
                    relation = self.apply(spec, relation, &value);
                }
            }
            relation
        })
    }

    /// Number of records on the page.
    ///
    /// # Errors
    ///
    /// Errors from the source, unmodified. Failures are not memoized.
    pub fn count(&self) -> Result<u64, LifeError> {
        self.count
            .get_or_try_init(|| self.source.count(self.call()))
            .copied()
    }

    /// Number of records across all pages.
    ///
    /// # Errors
    ///
    /// Errors from the source, unmodified. Failures are not memoized.
    pub fn total_count(&self) -> Result<u64, LifeError> {
        self.total_count
            .get_or_try_init(|| self.source.count(self.total_relation()))
            .copied()
    }

    /// Records on the page.
    ///
    /// # Errors
    ///
    /// Errors from the source, unmodified.
    pub fn records(&self) -> Result<Vec<S::Record>, LifeError> {
        self.source.load(self.call())
    }

    /// The window the parameters select, if the query is paginated.
    pub fn window(&self) -> Option<PageWindow> {
        self.window_specs()
            .filter_map(|spec| spec.filter().extract(&self.params))
            .filter_map(|value| PageWindow::from_value(&value))
            .last()
    }

    /// Page, page size and totals; `None` when the query is not paginated.
    ///
    /// # Errors
    ///
    /// Errors from counting the total relation.
    pub fn page_info(&self) -> Result<Option<PageInfo>, LifeError> {
        let Some(window) = self.window() else {
            return Ok(None);
        };
        let total_count = self.total_count()?;
        Ok(Some(PageInfo {
            page: window.page,
            limit: window.limit,
            total_count,
            total_pages: total_count.div_ceil(window.limit.max(1)),
        }))
    }

    fn window_specs(&self) -> impl Iterator<Item = &'d FilterSpec> {
        self.definition.specs().filter(|s| s.filter().is_window())
    }

    fn apply(&self, spec: &FilterSpec, relation: Relation, value: &Value) -> Relation {
        #[cfg(feature = "tracing")]
        let _span =
            tracing_helpers::apply_filter_span(self.definition.name(), spec.attribute(), spec.kind())
                .entered();

        log::debug!(
            "{}: applying '{}' filter on '{}' with {}",
            self.definition.name(),
            spec.kind(),
            spec.attribute(),
            value
        );
        #[cfg(feature = "metrics")]
        METRICS.record_filter(spec.kind());

        spec.filter().apply(relation, value)
    }

    fn trace_ignored_params(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        for key in self.params.keys() {
            if !self.definition.specs().any(|s| s.filter().reads(key)) {
                log::trace!("{}: ignoring parameter '{}'", self.definition.name(), key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOptions;
    use crate::query::MemorySource;
    use serde_json::json;
    use std::cell::Cell;

    /// Counts how often the source is asked to count.
    struct CountingSource {
        inner: MemorySource,
        calls: Cell<usize>,
    }

    impl RelationSource for CountingSource {
        type Record = Value;

        fn count(&self, relation: &Relation) -> Result<u64, LifeError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.count(relation)
        }

        fn load(&self, relation: &Relation) -> Result<Vec<Value>, LifeError> {
            self.inner.load(relation)
        }
    }

    fn definition() -> QueryDefinition {
        QueryDefinition::builder("ProductsQuery")
            .range("id")
            .unwrap()
            .searchable("name")
            .unwrap()
            .feature("paginate", "paginate", FilterOptions::new().with("lower", 2))
            .unwrap()
            .build()
    }

    fn source() -> CountingSource {
        CountingSource {
            inner: MemorySource::new()
                .with_records(
                    "products",
                    (0..3).map(|i| json!({ "name": format!("Sample{i}") })),
                )
                .unwrap(),
            calls: Cell::new(0),
        }
    }

    #[test]
    fn test_counts_are_memoized() {
        let definition = definition();
        let source = source();
        let query = QueryObject::new(&definition, json!({ "limit": 2, "page": 1 }), &source);

        assert_eq!(query.count().unwrap(), 2);
        assert_eq!(query.total_count().unwrap(), 3);
        assert_eq!(query.count().unwrap(), 2);
        assert_eq!(query.total_count().unwrap(), 3);
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_relations_are_built_once() {
        let definition = definition();
        let source = source();
        let query = QueryObject::new(&definition, json!({ "id_min": 2, "limit": 2 }), &source);

        assert!(std::ptr::eq(query.call(), query.call()));
        assert!(std::ptr::eq(query.total_relation(), query.total_relation()));
        assert_eq!(query.call().limit_value(), Some(2));
        assert_eq!(query.total_relation().limit_value(), None);
        assert_eq!(
            query.call().predicates(),
            query.total_relation().predicates()
        );
    }

    #[test]
    fn test_page_info() {
        let definition = definition();
        let source = source();

        let query = QueryObject::new(&definition, json!({ "limit": 2, "page": 2 }), &source);
        assert_eq!(query.count().unwrap(), 1);
        assert_eq!(
            query.page_info().unwrap(),
            Some(PageInfo {
                page: 2,
                limit: 2,
                total_count: 3,
                total_pages: 2,
            })
        );

        let unpaged = QueryObject::new(&definition, Params::new(), &source);
        assert_eq!(unpaged.page_info().unwrap(), None);
        assert_eq!(unpaged.count().unwrap(), 3);
    }

    #[test]
    fn test_defaults_merge_under_params() {
        let definition = QueryDefinition::extend("ProductsQuery", &definition())
            .default_param("paginate", true)
            .default_param("limit", 10)
            .build();
        let source = source();
        let query = QueryObject::new(&definition, json!({ "limit": 2 }), &source);

        assert_eq!(query.params().integer("limit"), Some(2));
        assert_eq!(query.params().flag("paginate"), Some(true));
        assert_eq!(query.count().unwrap(), 2);
    }

    #[test]
    fn test_records_on_page() {
        let definition = definition();
        let source = source();
        let query = QueryObject::new(&definition, json!({ "name": "Sample1" }), &source);
        let records = query.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], json!(2));
    }

    #[test]
    fn test_with_relation_narrows_given_relation() {
        let definition = definition();
        let source = source();
        let base = definition.relation().limit(1);
        let query = QueryObject::with_relation(&definition, Params::new(), base, &source);
        assert_eq!(query.total_count().unwrap(), 1);
    }
}
