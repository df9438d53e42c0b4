//! Query results as returned by a driver connection and by the query service.

use crate::types::Value;

/// A result row: one value per column, in field order.
pub type Row = Vec<Value>;

/// Column description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Field {
    pub name: String,
    /// MySQL column type code.
    pub field_type: i64,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: i64) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// The result of executing a query.
///
/// # Invariants
///
/// - A result used to seed a stream has `rows_affected == rows.len()`.
///   Results that only back `ExecuteFetch` may carry more rows than
///   `rows_affected`, never fewer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub fields: Vec<Field>,
    pub rows_affected: u64,
    pub insert_id: u64,
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// An empty result: no fields, no rows, nothing affected.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a result whose `rows_affected` matches its row count.
    #[must_use]
    pub fn from_rows(fields: Vec<Field>, rows: Vec<Row>) -> Self {
        Self {
            fields,
            rows_affected: rows.len() as u64,
            insert_id: 0,
            rows,
        }
    }

    /// A row fragment of a stream: rows, nothing else.
    #[must_use]
    pub fn rows_fragment(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}
