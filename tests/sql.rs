//! SQL sent to PostgreSQL for a full query definition.

mod common;

use common::{application_query, products_query};
use lifequery::{ExecutorSource, LifeError, LifeExecutor, QueryObject};
use may_postgres::types::ToSql;
use may_postgres::Row;
use serde_json::json;
use std::cell::RefCell;

/// Captures statements instead of running them.
#[derive(Default)]
struct CapturingExecutor {
    statements: RefCell<Vec<String>>,
}

impl CapturingExecutor {
    fn capture(&self, query: &str) -> LifeError {
        self.statements.borrow_mut().push(query.to_string());
        LifeError::Other("captured".to_string())
    }
}

impl LifeExecutor for CapturingExecutor {
    fn query_one(&self, query: &str, _params: &[&dyn ToSql]) -> Result<Row, LifeError> {
        Err(self.capture(query))
    }

    fn query_all(&self, query: &str, _params: &[&dyn ToSql]) -> Result<Vec<Row>, LifeError> {
        Err(self.capture(query))
    }
}

#[test]
fn test_page_and_total_statements() {
    let products = products_query(&application_query());
    let executor = CapturingExecutor::default();
    let source = ExecutorSource::new(&executor);
    let query = QueryObject::new(&products, json!({ "id_min": 2, "page": 2 }), &source);

    assert!(query.count().is_err());
    assert!(query.total_count().is_err());
    assert!(query.records().is_err());

    let statements = executor.statements.borrow();
    assert_eq!(statements.len(), 3);

    let page_count = &statements[0];
    assert!(page_count.starts_with("SELECT COUNT(*) FROM (SELECT * FROM \"products\""));
    assert!(page_count.contains(r#""products"."id" >= $1"#), "{page_count}");
    assert!(page_count.contains("LIMIT"), "{page_count}");
    assert!(page_count.contains("OFFSET"), "{page_count}");

    let total_count = &statements[1];
    assert!(total_count.contains(r#""products"."id" >= $1"#), "{total_count}");
    assert!(!total_count.contains("LIMIT"), "{total_count}");

    assert!(statements[2].starts_with("SELECT * FROM \"products\""));
}

#[test]
fn test_failed_counts_are_retried() {
    let products = products_query(&application_query());
    let executor = CapturingExecutor::default();
    let source = ExecutorSource::new(&executor);
    let query = QueryObject::new(&products, json!({}), &source);

    assert!(query.count().is_err());
    assert!(query.count().is_err());
    assert_eq!(executor.statements.borrow().len(), 2);
}

#[test]
fn test_rendered_page_relation() {
    let products = products_query(&application_query());
    let executor = CapturingExecutor::default();
    let source = ExecutorSource::new(&executor);
    let query = QueryObject::new(&products, json!({ "name": "Milk", "limit": 5 }), &source);

    let sql = query.call().to_sql_string();
    assert!(
        sql.starts_with(r#"SELECT * FROM "products" WHERE "products"."name" = 'Milk' LIMIT 5"#),
        "{sql}"
    );
    assert!(executor.statements.borrow().is_empty());
}

#[test]
fn test_far_page_is_still_sent() {
    let products = products_query(&application_query());
    let executor = CapturingExecutor::default();
    let source = ExecutorSource::new(&executor);
    let query = QueryObject::new(
        &products,
        json!({ "limit": 2, "page": i64::MAX }),
        &source,
    );

    match query.count() {
        Err(LifeError::Other(msg)) => assert_eq!(msg, "captured"),
        other => panic!("statement was not sent: {other:?}"),
    }
    assert_eq!(executor.statements.borrow().len(), 1);
}
