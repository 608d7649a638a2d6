//! Relations and the sources that materialize them.
//!
//! # Architecture
//!
//! - **Relation**: lazy description of a filtered, ordered, windowed table scan
//!   (`Relation`, `Predicate`, `ColumnRef`)
//! - **Value Conversion**: JSON parameters to SeaQuery values, SeaQuery values
//!   to `ToSql` parameters
//! - **Execution**: the `RelationSource` trait and the PostgreSQL-backed
//!   `ExecutorSource`
//! - **Memory**: `MemorySource`, evaluating relations over JSON records
//!
//! # Examples
//!
//! ```
//! use lifequery::query::{ColumnRef, Comparison, Predicate, Relation};
//! use serde_json::json;
//!
//! let adults = Relation::new("users").filter(Predicate::Compare {
//!     column: ColumnRef::new("age"),
//!     op: Comparison::Gte,
//!     value: json!(18),
//! });
//!
//! assert_eq!(
//!     adults.to_sql_string(),
//!     r#"SELECT * FROM "users" WHERE "users"."age" >= 18"#
//! );
//! ```

pub mod relation;
#[doc(inline)]
pub use relation::{ColumnRef, Comparison, Direction, Predicate, Relation};

pub mod value_conversion;

pub mod execution;
#[doc(inline)]
pub use execution::{ExecutorSource, RelationSource};

pub mod memory;
#[doc(inline)]
pub use memory::MemorySource;
