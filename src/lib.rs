//! # Lifequery
//!
//! Declarative query objects for PostgreSQL over `may_postgres` and SeaQuery.
//!
//! A [`QueryDefinition`] declares features (filters on attributes) once. Per
//! request, a [`QueryObject`] matches the supplied parameters against those
//! features, narrows a lazy [`Relation`], and reports the page and the total
//! count independently.
//!
//! ```
//! use lifequery::{FilterOptions, MemorySource, QueryDefinition};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let products = QueryDefinition::builder("ProductsQuery")
//!     .range("id")?
//!     .feature("name", "text", FilterOptions::new())?
//!     .feature("paginate", "paginate", FilterOptions::new().with("lower", 2))?
//!     .build();
//!
//! let source = MemorySource::new().with_records(
//!     "products",
//!     vec![json!({ "name": "Milk" }), json!({ "name": "Skimmed milk" }), json!({ "name": "Bread" })],
//! )?;
//!
//! let query = products.query(json!({ "name": "milk", "limit": 2 }), &source);
//! assert_eq!(query.total_count()?, 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod definition;
pub mod entity;
pub mod executor;
pub mod feature;
pub mod filter;
pub mod metrics;
pub mod naming;
pub mod params;
pub mod query;
pub mod query_object;

pub use definition::{QueryDefinition, QueryDefinitionBuilder};
pub use entity::{FromRow, LifeEntityName};
pub use executor::{LifeError, LifeExecutor, MayPostgresExecutor};
pub use feature::{Feature, FilterSpec};
pub use filter::{
    Cast, DeclarationError, Filter, FilterConstructor, FilterOptions, FilterOptionsError,
    FilterRegistry,
};
pub use params::Params;
pub use query::{ExecutorSource, MemorySource, Relation, RelationSource};
pub use query_object::{PageInfo, QueryObject};
