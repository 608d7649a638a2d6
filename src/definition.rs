//! Query definitions: the declared contract of a query object.
//!
//! A definition names its features and their filters, its default parameters,
//! the table it reads and the filter kinds it may use. It is assembled once
//! with a [`QueryDefinitionBuilder`] and read-only afterwards, so a single
//! definition can serve any number of requests.
//!
//! # Example
//!
//! ```
//! use lifequery::{FilterOptions, QueryDefinition};
//!
//! # fn main() -> Result<(), lifequery::DeclarationError> {
//! let application = QueryDefinition::builder("ApplicationQuery")
//!     .range("id")?
//!     .searchable("name")?
//!     .feature("paginate", "paginate", FilterOptions::new().with("lower", 2))?
//!     .build();
//!
//! let products = QueryDefinition::extend("ProductsQuery", &application)
//!     .default_param("paginate", true)
//!     .default_param("limit", 10)
//!     .build();
//!
//! assert_eq!(products.table_name(), "products");
//! assert_eq!(products.model_name(), "Product");
//! assert_eq!(products.features().len(), 3);
//! # Ok(())
//! # }
//! ```

use crate::entity::LifeEntityName;
use crate::feature::{Feature, FilterSpec};
use crate::filter::{
    DeclarationError, Filter, FilterOptions, FilterOptionsError, FilterRegistry,
};
use crate::naming::{model_name_for, table_name_for};
use crate::params::Params;
use crate::query::{Relation, RelationSource};
use crate::query_object::QueryObject;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct QueryDefinition {
    name: String,
    table_name: String,
    model_name: String,
    table_override: Option<String>,
    model_override: Option<String>,
    features: Vec<Feature>,
    defaults: Params,
    registry: Arc<FilterRegistry>,
}

impl QueryDefinition {
    /// Start a definition over the built-in filter kinds.
    pub fn builder(name: impl Into<String>) -> QueryDefinitionBuilder {
        QueryDefinitionBuilder {
            name: name.into(),
            table_override: None,
            model_override: None,
            features: Vec::new(),
            defaults: Params::new(),
            registry: FilterRegistry::child_of(FilterRegistry::builtin()),
        }
    }

    /// Start a definition that inherits everything `parent` declares.
    ///
    /// Features, defaults and explicitly set table/model names are copied;
    /// filter kinds registered on the child stay invisible to `parent`.
    pub fn extend(name: impl Into<String>, parent: &QueryDefinition) -> QueryDefinitionBuilder {
        let name = name.into();
        let features = parent
            .features
            .iter()
            .cloned()
            .map(|mut feature| {
                feature.rebind(&name);
                feature
            })
            .collect();
        QueryDefinitionBuilder {
            table_override: parent.table_override.clone(),
            model_override: parent.model_override.clone(),
            features,
            defaults: parent.defaults.clone(),
            registry: FilterRegistry::child_of(Arc::clone(&parent.registry)),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table queried when no starting relation is given.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Features in declaration order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature_named(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name() == name)
    }

    /// Every filter spec, in declaration order.
    pub fn specs(&self) -> impl Iterator<Item = &FilterSpec> {
        self.features.iter().flat_map(|f| f.specs())
    }

    pub fn filters_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a FilterSpec> {
        self.specs().filter(move |spec| spec.kind() == kind)
    }

    pub fn default_params(&self) -> &Params {
        &self.defaults
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Every record of the definition's table.
    pub fn relation(&self) -> Relation {
        Relation::new(self.table_name.as_str())
    }

    /// Bind request parameters over the definition's own relation.
    pub fn query<S: RelationSource>(&self, params: impl Into<Params>, source: S) -> QueryObject<'_, S> {
        QueryObject::new(self, params, source)
    }
}

/// Declares a [`QueryDefinition`].
#[derive(Debug, Clone)]
pub struct QueryDefinitionBuilder {
    name: String,
    table_override: Option<String>,
    model_override: Option<String>,
    features: Vec<Feature>,
    defaults: Params,
    registry: FilterRegistry,
}

impl QueryDefinitionBuilder {
    /// Declare a `kind` filter on `attribute`.
    ///
    /// Repeating an attribute adds another filter to the same feature.
    ///
    /// # Errors
    ///
    /// Fails immediately when `kind` is not registered or rejects `options`.
    pub fn feature(
        mut self,
        attribute: &str,
        kind: &str,
        options: FilterOptions,
    ) -> Result<Self, DeclarationError> {
        let index = match self.features.iter().position(|f| f.name() == attribute) {
            Some(index) => index,
            None => {
                self.features.push(Feature::new(attribute, self.name.as_str()));
                self.features.len() - 1
            }
        };

        let created = self.features[index]
            .create_filter(&self.registry, kind, options)
            .map(|_| ());
        if let Err(err) = created {
            if self.features[index].specs().is_empty() {
                self.features.remove(index);
            }
            return Err(err);
        }
        Ok(self)
    }

    /// `min` and `max` on `attribute` (`<attr>_min`, `<attr>_max`).
    ///
    /// # Errors
    ///
    /// See [`feature`](Self::feature).
    pub fn range(self, attribute: &str) -> Result<Self, DeclarationError> {
        self.feature(attribute, "min", FilterOptions::new())?
            .feature(attribute, "max", FilterOptions::new())
    }

    /// Exact match on `attribute`, driven by the parameter of the same name.
    ///
    /// # Errors
    ///
    /// See [`feature`](Self::feature).
    pub fn searchable(self, attribute: &str) -> Result<Self, DeclarationError> {
        self.feature(attribute, "search", FilterOptions::new())
    }

    /// The usual listing features: `ids`, `since_id` and pagination between
    /// `lower` and `upper` (configured bounds when `None`).
    ///
    /// # Errors
    ///
    /// See [`feature`](Self::feature).
    pub fn standard_features(
        self,
        lower: Option<u64>,
        upper: Option<u64>,
    ) -> Result<Self, DeclarationError> {
        let mut paginate = FilterOptions::new();
        if let Some(lower) = lower {
            paginate = paginate.with("lower", lower);
        }
        if let Some(upper) = upper {
            paginate = paginate.with("upper", upper);
        }
        self.feature("id", "in", FilterOptions::new())?
            .feature("id", "since", FilterOptions::new())?
            .feature("paginate", "paginate", paginate)
    }

    /// Make `key` available to this definition and its descendants.
    pub fn register_filter<F>(mut self, key: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&FilterOptions, &Feature) -> Result<Arc<dyn Filter>, FilterOptionsError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register(key, constructor);
        self
    }

    /// Parameter used when the request does not supply `key`.
    pub fn default_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_override = Some(table_name.into());
        self
    }

    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_override = Some(model_name.into());
        self
    }

    /// Take table and model names from an entity.
    pub fn entity<E: LifeEntityName>(self) -> Self {
        let entity = E::default();
        self.table_name(entity.table_name())
            .model_name(entity.model_name())
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn build(self) -> QueryDefinition {
        let table_name = self
            .table_override
            .clone()
            .unwrap_or_else(|| table_name_for(&self.name));
        let model_name = self
            .model_override
            .clone()
            .unwrap_or_else(|| model_name_for(&self.name));
        log::debug!(
            "Declared {} over '{}' with {} feature(s)",
            self.name,
            table_name,
            self.features.len()
        );

        QueryDefinition {
            name: self.name,
            table_name,
            model_name,
            table_override: self.table_override,
            model_override: self.model_override,
            features: self.features,
            defaults: self.defaults,
            registry: Arc::new(self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::TextFilter;
    use serde_json::json;

    fn application() -> QueryDefinition {
        QueryDefinition::builder("ApplicationQuery")
            .range("id")
            .unwrap()
            .range("created_at")
            .unwrap()
            .feature("name", "search", FilterOptions::new().with("as", "name"))
            .unwrap()
            .feature(
                "paginate",
                "paginate",
                FilterOptions::new().with("upper", 100).with("lower", 2),
            )
            .unwrap()
            .build()
    }

    #[test]
    fn test_definition_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryDefinition>();
    }

    #[test]
    fn test_features_in_declaration_order() {
        let definition = application();
        let names: Vec<_> = definition.features().iter().map(Feature::name).collect();
        assert_eq!(names, vec!["id", "created_at", "name", "paginate"]);
        assert_eq!(definition.feature_named("id").unwrap().specs().len(), 2);
        assert_eq!(definition.filters_of_kind("min").count(), 2);
        assert_eq!(definition.specs().count(), 6);
    }

    #[test]
    fn test_derived_names() {
        let definition = application();
        assert_eq!(definition.table_name(), "applications");
        assert_eq!(definition.model_name(), "Application");
        assert_eq!(
            definition.relation().to_sql_string(),
            r#"SELECT * FROM "applications""#
        );
    }

    #[test]
    fn test_child_copies_then_overrides() {
        let parent = application();
        let child = QueryDefinition::extend("ProductsQuery", &parent)
            .default_param("paginate", true)
            .default_param("limit", 10)
            .feature(
                "id",
                "search",
                FilterOptions::new()
                    .with("as", "id")
                    .with("cond", "eq")
                    .with("table_name", "custom_table_name"),
            )
            .unwrap()
            .build();

        assert_eq!(child.table_name(), "products");
        assert_eq!(child.feature_named("id").unwrap().specs().len(), 3);
        assert_eq!(child.feature_named("id").unwrap().query(), "ProductsQuery");
        assert_eq!(parent.feature_named("id").unwrap().specs().len(), 2);
        assert_eq!(
            child.default_params(),
            &Params::from(json!({ "limit": 10, "paginate": true }))
        );
        assert!(parent.default_params().is_empty());
    }

    #[test]
    fn test_explicit_names_are_inherited() {
        let base = QueryDefinition::builder("BaseQuery")
            .table_name("catalog_items")
            .model_name("CatalogItem")
            .build();
        let child = QueryDefinition::extend("ProductsQuery", &base).build();
        assert_eq!(child.table_name(), "catalog_items");
        assert_eq!(child.model_name(), "CatalogItem");
    }

    #[test]
    fn test_unknown_kind_fails_declaration() {
        let err = QueryDefinition::builder("ProductsQuery")
            .feature("id", "between", FilterOptions::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "ProductsQuery: unknown filter kind 'between'"
        );
    }

    #[test]
    fn test_registered_kind_is_local_to_definition() {
        let parent = application();
        let child = QueryDefinition::extend("ProductsQuery", &parent)
            .register_filter("fuzzy", TextFilter::construct)
            .feature("name", "fuzzy", FilterOptions::new())
            .unwrap()
            .build();
        let sibling = QueryDefinition::extend("AccountsQuery", &parent);

        assert_eq!(child.registry().len(), 9);
        assert!(!parent.registry().contains("fuzzy"));
        assert!(sibling
            .feature("name", "fuzzy", FilterOptions::new())
            .is_err());
    }

    #[test]
    fn test_standard_features() {
        let definition = QueryDefinition::builder("ProductsQuery")
            .standard_features(Some(1), None)
            .unwrap()
            .build();
        let keys: Vec<_> = definition
            .specs()
            .map(|spec| spec.filter().param_key().to_string())
            .collect();
        assert_eq!(keys, vec!["ids", "since_id", "paginate"]);
    }

    #[test]
    fn test_entity_binding() {
        #[derive(Default)]
        struct Account;

        impl LifeEntityName for Account {
            fn table_name(&self) -> &'static str {
                "user_accounts"
            }
        }

        let definition = QueryDefinition::builder("AccountsQuery")
            .entity::<Account>()
            .build();
        assert_eq!(definition.table_name(), "user_accounts");
        assert_eq!(definition.model_name(), "Account");
    }
}
