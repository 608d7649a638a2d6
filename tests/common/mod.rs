//! Shared fixtures: a small shop with products and accounts, and the query
//! definitions used across the integration tests.

#![allow(dead_code)]

use fake::faker::lorem::en::Word;
use fake::faker::name::en::Name;
use fake::Fake;
use lifequery::{FilterOptions, MemorySource, QueryDefinition};
use serde_json::json;

/// `ApplicationQuery`: ranges on `id` and `created_at`, exact `name`, and
/// pagination between 2 and 100.
pub fn application_query() -> QueryDefinition {
    QueryDefinition::builder("ApplicationQuery")
        .feature("id", "min", FilterOptions::new())
        .and_then(|b| b.feature("id", "max", FilterOptions::new()))
        .and_then(|b| b.range("created_at"))
        .and_then(|b| b.feature("name", "search", FilterOptions::new().with("as", "name")))
        .and_then(|b| {
            b.feature(
                "paginate",
                "paginate",
                FilterOptions::new().with("upper", 100).with("lower", 2),
            )
        })
        .expect("application query declares")
        .build()
}

/// Paginated by default, with an exact `id` match against another table.
pub fn products_query(application: &QueryDefinition) -> QueryDefinition {
    QueryDefinition::extend("ProductsQuery", application)
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
        .expect("products query declares")
        .build()
}

pub fn accounts_query(application: &QueryDefinition) -> QueryDefinition {
    QueryDefinition::extend("AccountsQuery", application)
        .default_param("paginate", true)
        .default_param("limit", 10)
        .feature(
            "id",
            "search",
            FilterOptions::new().with("as", "id").with("cond", "eq"),
        )
        .expect("accounts query declares")
        .build()
}

/// Three products and three accounts named `Sample0`..`Sample2`.
pub fn shop() -> MemorySource {
    let mut source = MemorySource::new();
    source.define_table("products", &["name", "created_at"]);
    source.define_table("accounts", &["name", "created_at"]);
    for i in 0..3 {
        for table in ["products", "accounts"] {
            source
                .insert(
                    table,
                    json!({
                        "name": format!("Sample{i}"),
                        "created_at": format!("2024-01-0{}T09:00:00Z", i + 1),
                    }),
                )
                .expect("fixture insert");
        }
    }
    source
}

/// Adds `n` products with generated names and descriptions.
pub fn add_filler_products(source: &mut MemorySource, n: usize) {
    for _ in 0..n {
        let name: String = Name().fake();
        let word: String = Word().fake();
        source
            .insert(
                "products",
                json!({
                    "name": name,
                    "description": word,
                    "created_at": "2024-02-01T09:00:00Z",
                }),
            )
            .expect("filler insert");
    }
}
