//! SQL text paired with named bind variables.

use std::collections::BTreeMap;

use crate::types::Value;

/// Bind variables by name.
///
/// Equality is set-of-pairs equality: the order in which variables were
/// bound carries no meaning.
pub type BindVariables = BTreeMap<String, Value>;

/// A SQL statement together with its bind variables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundQuery {
    pub sql: String,
    pub bind_variables: BindVariables,
}

impl BoundQuery {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bind_variables: BindVariables::new(),
        }
    }

    /// Add (or replace) a bind variable.
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletserver::types::{BoundQuery, Value};
    /// let query = BoundQuery::new("select * from t where id = :id").bind("id", 7_i64);
    /// assert_eq!(query.bind_variables.get("id"), Some(&Value::Int(7)));
    /// ```
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind_variables.insert(name.into(), value.into());
        self
    }
}

/// One partition of a split query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySplit {
    pub query: BoundQuery,
    /// Estimated number of rows this partition returns.
    pub row_count: u64,
}
