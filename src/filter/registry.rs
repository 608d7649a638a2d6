//! Filter registry: filter kind keys to constructors.
//!
//! The built-in registry holds the eight standard kinds. Every query
//! definition owns a registry layered over its parent's: registrations land in
//! the definition's own layer and never reach the parent or siblings. Each
//! layer keeps a flattened copy of everything it can see, so lookups are a
//! single map access.

use super::after::AfterFilter;
use super::bound::{BoundFilter, BoundKind};
use super::membership::InFilter;
use super::paginate::PaginateFilter;
use super::search::{SearchFilter, TextFilter};
use super::{Filter, FilterOptions, FilterOptionsError};
use crate::feature::Feature;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds a filter from its declared options and owning feature.
pub type FilterConstructor = Arc<
    dyn Fn(&FilterOptions, &Feature) -> Result<Arc<dyn Filter>, FilterOptionsError>
        + Send
        + Sync,
>;

static BUILTIN: Lazy<Arc<FilterRegistry>> = Lazy::new(|| {
    let mut registry = FilterRegistry::empty();
    registry.register("min", |options: &FilterOptions, feature: &Feature| {
        BoundFilter::construct(BoundKind::Min, options, feature)
    });
    registry.register("max", |options: &FilterOptions, feature: &Feature| {
        BoundFilter::construct(BoundKind::Max, options, feature)
    });
    registry.register("since", |options: &FilterOptions, feature: &Feature| {
        BoundFilter::construct(BoundKind::Since, options, feature)
    });
    registry.register("search", SearchFilter::construct);
    registry.register("text", TextFilter::construct);
    registry.register("in", InFilter::construct);
    registry.register("after", AfterFilter::construct);
    registry.register("paginate", PaginateFilter::construct);
    Arc::new(registry)
});

#[derive(Clone, Default)]
pub struct FilterRegistry {
    local: BTreeMap<String, FilterConstructor>,
    parent: Option<Arc<FilterRegistry>>,
    resolved: BTreeMap<String, FilterConstructor>,
}

impl FilterRegistry {
    /// A registry with no entries and no parent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared registry of built-in filters.
    pub fn builtin() -> Arc<FilterRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// An empty layer over `parent`.
    pub fn child_of(parent: Arc<FilterRegistry>) -> Self {
        Self {
            local: BTreeMap::new(),
            resolved: parent.resolved.clone(),
            parent: Some(parent),
        }
    }

    /// Add or replace `key` in this layer.
    pub fn register<F>(&mut self, key: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&FilterOptions, &Feature) -> Result<Arc<dyn Filter>, FilterOptionsError>
            + Send
            + Sync
            + 'static,
    {
        self.register_constructor(key, Arc::new(constructor))
    }

    pub fn register_constructor(
        &mut self,
        key: impl Into<String>,
        constructor: FilterConstructor,
    ) -> &mut Self {
        let key = key.into();
        log::trace!("Registering filter kind '{}'", key);
        self.local.insert(key.clone(), Arc::clone(&constructor));
        self.resolved.insert(key, constructor);
        self
    }

    /// Constructor for `key`, from this layer or the nearest ancestor.
    pub fn lookup(&self, key: &str) -> Option<&FilterConstructor> {
        self.resolved.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resolved.contains_key(key)
    }

    /// Number of visible kinds.
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Visible kinds, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.resolved.keys().map(String::as_str)
    }

    /// Kinds registered in this layer only.
    pub fn local_keys(&self) -> impl Iterator<Item = &str> {
        self.local.keys().map(String::as_str)
    }

    pub fn parent(&self) -> Option<&Arc<FilterRegistry>> {
        self.parent.as_ref()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("local", &self.local.keys().collect::<Vec<_>>())
            .field("resolved", &self.resolved.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_text(
        options: &FilterOptions,
        feature: &Feature,
    ) -> Result<Arc<dyn Filter>, FilterOptionsError> {
        TextFilter::construct(options, feature)
    }

    #[test]
    fn test_builtin_kinds() {
        let builtin = FilterRegistry::builtin();
        assert_eq!(builtin.len(), 8);
        assert_eq!(
            builtin.keys().collect::<Vec<_>>(),
            vec!["after", "in", "max", "min", "paginate", "search", "since", "text"]
        );
    }

    #[test]
    fn test_child_sees_parent_and_own_entries() {
        let mut child = FilterRegistry::child_of(FilterRegistry::builtin());
        child.register("fuzzy", always_text);
        child.register("like", always_text);

        assert_eq!(child.len(), 10);
        assert!(child.contains("fuzzy"));
        assert!(child.contains("min"));
        assert_eq!(child.local_keys().collect::<Vec<_>>(), vec!["fuzzy", "like"]);
        assert_eq!(FilterRegistry::builtin().len(), 8);
    }

    #[test]
    fn test_siblings_are_isolated() {
        let parent = Arc::new(FilterRegistry::child_of(FilterRegistry::builtin()));
        let mut left = FilterRegistry::child_of(Arc::clone(&parent));
        let right = FilterRegistry::child_of(Arc::clone(&parent));
        left.register("fuzzy", always_text);

        assert!(left.contains("fuzzy"));
        assert!(!right.contains("fuzzy"));
        assert!(!parent.contains("fuzzy"));
    }

    #[test]
    fn test_child_overrides_builtin_key() {
        let mut child = FilterRegistry::child_of(FilterRegistry::builtin());
        child.register("search", always_text);

        let feature = Feature::new("name", "ProductsQuery");
        let constructor = child.lookup("search").unwrap();
        let filter = constructor(&FilterOptions::new(), &feature).unwrap();
        assert_eq!(filter.kind(), "text");

        let builtin = FilterRegistry::builtin();
        let filter = builtin.lookup("search").unwrap()(&FilterOptions::new(), &feature).unwrap();
        assert_eq!(filter.kind(), "search");
    }
}
