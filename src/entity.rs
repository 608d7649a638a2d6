//! Entity binding traits.
//!
//! A query definition can be bound to an entity instead of deriving its table
//! from its own name; rows loaded through PostgreSQL decode via [`FromRow`].

use may_postgres::Row;

/// Names the table an entity is stored in.
///
/// # Example
///
/// ```
/// use lifequery::LifeEntityName;
///
/// #[derive(Default)]
/// struct Product;
///
/// impl LifeEntityName for Product {
///     fn table_name(&self) -> &'static str {
///         "products"
///     }
/// }
///
/// assert_eq!(Product.table_name(), "products");
/// assert_eq!(Product.model_name(), "Product");
/// ```
pub trait LifeEntityName: Default {
    fn table_name(&self) -> &'static str;

    /// Type name without its module path.
    fn model_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Trait for types that can be created from a database row
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error>;
}
