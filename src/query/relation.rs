//! Lazy relation descriptions.
//!
//! A [`Relation`] records what a query object has decided (table, predicates,
//! ordering, window) without executing anything. It is translated into a
//! SeaQuery `SelectStatement` only when a [`RelationSource`](super::RelationSource)
//! materializes it, so two relations derived from the same filters (the page and
//! the total) can be counted independently.

use crate::query::value_conversion::json_to_value;
use sea_query::{
    Alias, Asterisk, Condition, Expr, ExprTrait, Func, Order, PostgresQueryBuilder,
    Query, SelectStatement, Values,
};
use serde_json::Value;
use std::fmt;

/// Column reference; an unqualified column belongs to the relation's own table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    table: Option<String>,
    column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    /// Qualify with `table` when given, keep the current qualification otherwise.
    pub fn in_table(mut self, table: Option<String>) -> Self {
        if table.is_some() {
            self.table = table;
        }
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Table this column is read from inside a relation over `default_table`.
    pub fn resolve_table<'a>(&'a self, default_table: &'a str) -> &'a str {
        self.table.as_deref().unwrap_or(default_table)
    }

    pub(crate) fn to_expr(&self, default_table: &str) -> Expr {
        Expr::col((
            Alias::new(self.resolve_table(default_table)),
            Alias::new(self.column.as_str()),
        ))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => f.write_str(&self.column),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "<>",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        }
    }

    /// Whether `ordering` (row value against the operand) satisfies the comparison.
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Comparison::Eq => ordering == Equal,
            Comparison::NotEq => ordering != Equal,
            Comparison::Gt => ordering == Greater,
            Comparison::Gte => ordering != Less,
            Comparison::Lt => ordering == Less,
            Comparison::Lte => ordering != Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        }
    }
}

/// One narrowing condition added by a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> value`
    Compare {
        column: ColumnRef,
        op: Comparison,
        value: Value,
    },
    /// `column IN (values)`
    In { column: ColumnRef, values: Vec<Value> },
    /// Case-insensitive substring match.
    Contains { column: ColumnRef, needle: String },
    /// `column` strictly greater than the `column` of the record whose `key`
    /// equals `reference`; no restriction when that record does not exist.
    After {
        column: ColumnRef,
        key: ColumnRef,
        reference: Value,
    },
}

impl Predicate {
    /// Column the predicate restricts.
    pub fn column(&self) -> &ColumnRef {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::In { column, .. }
            | Predicate::Contains { column, .. }
            | Predicate::After { column, .. } => column,
        }
    }

    pub(crate) fn to_condition(&self, table: &str) -> Condition {
        match self {
            Predicate::Compare { column, op, value } => {
                let col = column.to_expr(table);
                let value = json_to_value(value);
                let expr = match op {
                    Comparison::Eq => col.eq(value),
                    Comparison::NotEq => col.ne(value),
                    Comparison::Gt => col.gt(value),
                    Comparison::Gte => col.gte(value),
                    Comparison::Lt => col.lt(value),
                    Comparison::Lte => col.lte(value),
                };
                Condition::all().add(expr)
            }
            // IN () is always false
            Predicate::In { values, .. } if values.is_empty() => {
                Condition::all().add(Expr::cust("1=0"))
            }
            Predicate::In { column, values } => Condition::all()
                .add(column.to_expr(table).is_in(values.iter().map(json_to_value))),
            Predicate::Contains { column, needle } => {
                let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
                Condition::all().add(Expr::from(Func::lower(column.to_expr(table))).like(pattern))
            }
            Predicate::After {
                column,
                key,
                reference,
            } => {
                let lookup_table = key.resolve_table(table).to_string();
                let mut lookup = Query::select();
                lookup
                    .column((
                        Alias::new(lookup_table.as_str()),
                        Alias::new(column.column()),
                    ))
                    .from(Alias::new(lookup_table.as_str()))
                    .cond_where(
                        Condition::all()
                            .add(key.to_expr(&lookup_table).eq(json_to_value(reference))),
                    )
                    .limit(1);
                let referenced =
                    || Expr::SubQuery(None, Box::new(lookup.clone().into_sub_query_statement()));

                Condition::any()
                    .add(referenced().is_null())
                    .add(column.to_expr(table).gt(referenced()))
            }
        }
    }
}

/// Escape LIKE metacharacters with PostgreSQL's default escape character.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A composable, lazily executed query over one table.
///
/// # Example
///
/// ```
/// use lifequery::query::{ColumnRef, Comparison, Direction, Predicate, Relation};
/// use serde_json::json;
///
/// let relation = Relation::new("products")
///     .filter(Predicate::Compare {
///         column: ColumnRef::new("id"),
///         op: Comparison::Gte,
///         value: json!(2),
///     })
///     .order_by(ColumnRef::new("id"), Direction::Asc)
///     .limit(10);
///
/// let (sql, _values) = relation.build();
/// assert!(sql.starts_with("SELECT * FROM \"products\""));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    table: String,
    predicates: Vec<Predicate>,
    orders: Vec<(ColumnRef, Direction)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Relation {
    /// Every record of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, column: ColumnRef, direction: Direction) -> Self {
        self.orders.push((column, direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The same relation without LIMIT/OFFSET.
    pub fn unwindowed(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn orders(&self) -> &[(ColumnRef, Direction)] {
        &self.orders
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// `SELECT * FROM <table> WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
    pub fn select_statement(&self) -> SelectStatement {
        let mut query = Query::select();
        query.column(Asterisk).from(Alias::new(self.table.as_str()));
        for predicate in &self.predicates {
            query.cond_where(predicate.to_condition(&self.table));
        }
        for (column, direction) in &self.orders {
            query.order_by(
                (
                    Alias::new(column.resolve_table(&self.table)),
                    Alias::new(column.column()),
                ),
                Order::from(*direction),
            );
        }
        if let Some(limit) = self.limit {
            query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query.offset(offset);
        }
        query
    }

    /// Parameterized PostgreSQL text and its bound values.
    pub fn build(&self) -> (String, Values) {
        self.select_statement().build(PostgresQueryBuilder)
    }

    /// PostgreSQL text with values inlined, for logs and assertions.
    pub fn to_sql_string(&self) -> String {
        self.select_statement().to_string(PostgresQueryBuilder)
    }
}
