//! In-memory relation source.
//!
//! Tables are lists of JSON objects. Relations are evaluated the way PostgreSQL
//! would evaluate the SQL they build: the same predicates, `NULL` never
//! matching a comparison, `NULLS LAST` for ascending order, and the same
//! classes of errors for unknown tables, columns and incomparable operands.

use crate::executor::LifeError;
use crate::query::execution::RelationSource;
use crate::query::relation::{ColumnRef, Comparison, Direction, Predicate, Relation};
use crate::query::value_conversion::parse_timestamp;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

type Record = Map<String, Value>;

#[derive(Debug, Clone, Default)]
struct Table {
    columns: BTreeSet<String>,
    rows: Vec<Record>,
    next_id: i64,
}

/// Named tables of JSON records.
///
/// Records without an `id` get the next sequential one, starting at 1.
///
/// # Example
///
/// ```
/// use lifequery::{MemorySource, Relation, RelationSource};
/// use serde_json::json;
///
/// let mut source = MemorySource::new();
/// source.insert("products", json!({ "name": "Milk" })).unwrap();
/// source.insert("products", json!({ "name": "Bread" })).unwrap();
///
/// assert_eq!(source.count(&Relation::new("products")).unwrap(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: BTreeMap<String, Table>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `table` with `columns` (plus `id`); existing tables gain the columns.
    pub fn define_table(&mut self, table: &str, columns: &[&str]) -> &mut Self {
        let entry = self.table_entry(table);
        entry.columns.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Insert one record, creating the table on first use. Returns the record's id.
    ///
    /// # Errors
    ///
    /// Returns `LifeError::QueryError` when `record` is not a JSON object or its
    /// `id` is not an integer.
    pub fn insert(&mut self, table: &str, record: Value) -> Result<i64, LifeError> {
        let Value::Object(mut record) = record else {
            return Err(LifeError::QueryError(format!(
                "cannot insert non-object record into \"{}\": {}",
                table, record
            )));
        };

        let entry = self.table_entry(table);
        let id = match record.get("id") {
            None | Some(Value::Null) => {
                entry.next_id += 1;
                record.insert("id".to_string(), Value::from(entry.next_id));
                entry.next_id
            }
            Some(Value::Number(n)) if n.is_i64() => {
                let id = n.as_i64().unwrap_or_default();
                entry.next_id = entry.next_id.max(id);
                id
            }
            Some(other) => {
                return Err(LifeError::QueryError(format!(
                    "invalid input syntax for type integer: {}",
                    other
                )));
            }
        };

        entry.columns.extend(record.keys().cloned());
        entry.rows.push(record);
        Ok(id)
    }

    /// Builder-style bulk insert.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    pub fn with_records(
        mut self,
        table: &str,
        records: impl IntoIterator<Item = Value>,
    ) -> Result<Self, LifeError> {
        self.table_entry(table);
        for record in records {
            self.insert(table, record)?;
        }
        Ok(self)
    }

    /// Every record of `table` in insertion order.
    pub fn records(&self, table: &str) -> Option<&[Record]> {
        self.tables.get(table).map(|t| t.rows.as_slice())
    }

    fn table_entry(&mut self, table: &str) -> &mut Table {
        let entry = self.tables.entry(table.to_string()).or_default();
        entry.columns.insert("id".to_string());
        entry
    }

    fn table(&self, name: &str) -> Result<&Table, LifeError> {
        self.tables
            .get(name)
            .ok_or_else(|| LifeError::QueryError(format!("relation \"{}\" does not exist", name)))
    }

    /// Rows the relation selects, window applied.
    ///
    /// # Errors
    ///
    /// `LifeError::QueryError` for the conditions PostgreSQL would reject.
    pub fn evaluate<'a>(&'a self, relation: &Relation) -> Result<Vec<&'a Record>, LifeError> {
        let table = self.table(relation.table())?;

        let mut tests = Vec::with_capacity(relation.predicates().len());
        for predicate in relation.predicates() {
            tests.push(self.compile(relation.table(), table, predicate)?);
        }
        for (column, _) in relation.orders() {
            check_column(relation.table(), table, column)?;
        }

        let mut rows = Vec::new();
        for row in &table.rows {
            let mut keep = true;
            for test in &tests {
                if !test.matches(row)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                rows.push(row);
            }
        }

        if !relation.orders().is_empty() {
            rows.sort_by(|a, b| {
                relation
                    .orders()
                    .iter()
                    .map(|(column, direction)| {
                        let ordering = order_nulls_last(
                            a.get(column.column()),
                            b.get(column.column()),
                        );
                        match direction {
                            Direction::Asc => ordering,
                            Direction::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let offset = relation.offset_value().unwrap_or(0);
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let rows = rows.into_iter().skip(offset);
        Ok(match relation.limit_value() {
            Some(limit) => rows
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows.collect(),
        })
    }

    /// Resolve tables and columns once, before any row is visited.
    fn compile<'p>(
        &self,
        relation_table: &str,
        table: &Table,
        predicate: &'p Predicate,
    ) -> Result<RowTest<'p>, LifeError> {
        check_column(relation_table, table, predicate.column())?;
        let column = predicate.column().column();
        Ok(match predicate {
            Predicate::Compare { op, value, .. } => RowTest::Compare {
                column,
                op: *op,
                operand: value,
            },
            Predicate::In { values, .. } => RowTest::In { column, values },
            Predicate::Contains { needle, .. } => RowTest::Contains {
                column,
                needle: needle.to_lowercase(),
            },
            Predicate::After { key, reference, .. } => {
                let lookup_name = key.resolve_table(relation_table);
                let lookup = self.table(lookup_name)?;
                check_column(lookup_name, lookup, key)?;
                if !lookup.columns.contains(column) {
                    return Err(unknown_column(lookup_name, column));
                }

                let mut referenced = None;
                for row in &lookup.rows {
                    if compare(row.get(key.column()), Comparison::Eq, reference)? == Some(Ordering::Equal) {
                        referenced = row.get(column).filter(|v| !v.is_null()).cloned();
                        break;
                    }
                }
                match referenced {
                    Some(bound) => RowTest::Greater { column, bound },
                    None => RowTest::Always,
                }
            }
        })
    }
}

enum RowTest<'p> {
    Compare {
        column: &'p str,
        op: Comparison,
        operand: &'p Value,
    },
    In {
        column: &'p str,
        values: &'p [Value],
    },
    Contains {
        column: &'p str,
        needle: String,
    },
    Greater {
        column: &'p str,
        bound: Value,
    },
    Always,
}

impl RowTest<'_> {
    fn matches(&self, row: &Record) -> Result<bool, LifeError> {
        Ok(match self {
            RowTest::Compare {
                column,
                op,
                operand,
            } => compare(row.get(*column), *op, operand)?.is_some_and(|o| op.holds(o)),
            RowTest::In { column, values } => {
                let mut found = false;
                for value in values.iter() {
                    if compare(row.get(*column), Comparison::Eq, value)? == Some(Ordering::Equal) {
                        found = true;
                        break;
                    }
                }
                found
            }
            RowTest::Contains { column, needle } => match row.get(*column) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => s.to_lowercase().contains(needle.as_str()),
                Some(other) => {
                    return Err(LifeError::QueryError(format!(
                        "function lower({}) does not exist",
                        type_name(other)
                    )))
                }
            },
            RowTest::Greater { column, bound } => {
                compare(row.get(*column), Comparison::Gt, bound)? == Some(Ordering::Greater)
            }
            RowTest::Always => true,
        })
    }
}

fn unknown_column(table: &str, column: &str) -> LifeError {
    LifeError::QueryError(format!("column {}.{} does not exist", table, column))
}

fn check_column(relation_table: &str, table: &Table, column: &ColumnRef) -> Result<(), LifeError> {
    if let Some(qualifier) = column.table() {
        if qualifier != relation_table {
            return Err(LifeError::QueryError(format!(
                "missing FROM-clause entry for table \"{}\"",
                qualifier
            )));
        }
    }
    if !table.columns.contains(column.column()) {
        return Err(unknown_column(relation_table, column.column()));
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "unknown",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "numeric",
        Value::Number(_) => "integer",
        Value::String(s) if parse_timestamp(s).is_some() => "timestamp with time zone",
        Value::String(_) => "text",
        Value::Array(_) | Value::Object(_) => "jsonb",
    }
}

/// Ordering of a row value against an operand; `None` when either is `NULL`.
fn compare(
    row: Option<&Value>,
    op: Comparison,
    operand: &Value,
) -> Result<Option<Ordering>, LifeError> {
    let Some(row) = row.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    if operand.is_null() {
        return Ok(None);
    }
    match (row, operand) {
        (Value::Number(a), Value::Number(b)) => Ok(match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        }),
        (Value::String(a), Value::String(b)) => {
            Ok(match (parse_timestamp(a), parse_timestamp(b)) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            })
        }
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => {
            Ok((row == operand).then_some(Ordering::Equal))
        }
        _ => Err(LifeError::QueryError(format!(
            "operator does not exist: {} {} {}",
            type_name(row),
            op.symbol(),
            type_name(operand)
        ))),
    }
}

/// Ascending order with `NULL` after every value; incomparable values tie.
fn order_nulls_last(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare(Some(a), Comparison::Eq, b)
            .ok()
            .flatten()
            .unwrap_or(Ordering::Equal),
    }
}

impl RelationSource for MemorySource {
    type Record = Value;

    fn count(&self, relation: &Relation) -> Result<u64, LifeError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::materialize_span(relation.table(), "count").entered();

        let rows = self.evaluate(relation)?;
        Ok(rows.len() as u64)
    }

    fn load(&self, relation: &Relation) -> Result<Vec<Value>, LifeError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::materialize_span(relation.table(), "load").entered();

        let rows = self.evaluate(relation)?;
        Ok(rows.into_iter().cloned().map(Value::Object).collect())
    }
}
