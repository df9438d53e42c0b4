//! Driver-level database connection interface.
//!
//! A `DbConnection` is what a tablet server runs queries on. Connections are
//! produced by factories registered in a [`DriverRegistry`], and get their
//! identifiers from an injectable [`IdSource`].
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use tabletserver::fakesqldb::FakeDb;
//! use tabletserver::sqldb::{DriverRegistry, SequentialIdSource};
//!
//! let registry = DriverRegistry::new();
//! let db = FakeDb::with_id_source(Arc::new(SequentialIdSource::default()));
//! let name = db.register(&registry);
//!
//! let mut conn = registry.connect(&name).unwrap();
//! let result = conn.execute_fetch("select 1", 10, true).unwrap();
//! assert_eq!(result.rows_affected, 0);
//! ```

mod error;
mod id_source;
mod registry;

use std::collections::HashMap;

pub use error::{CONNECT_FAIL_ERRNO, SqlError};
pub use id_source::{IdSource, RandomIdSource, SeededIdSource, SequentialIdSource};
pub use registry::{ConnectFn, DriverRegistry};

use crate::types::{ConnectionId, Field, QueryResult, Row};

/// Collation id of `utf8_general_ci`.
pub const UTF8_GENERAL_CI: i32 = 33;

/// Per-session character set variables, as collation ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    pub client: i32,
    pub conn: i32,
    pub server: i32,
}

impl Default for Charset {
    fn default() -> Self {
        Self {
            client: UTF8_GENERAL_CI,
            conn: UTF8_GENERAL_CI,
            server: UTF8_GENERAL_CI,
        }
    }
}

/// A synchronous database connection.
///
/// A connection has a single owner: mutating calls take `&mut self`.
/// Distinct connections may be used from different threads at once.
pub trait DbConnection: Send {
    /// Run `query` and return at most `max_rows` rows.
    ///
    /// Fields are only filled in when `want_fields` is set.
    fn execute_fetch(
        &mut self,
        query: &str,
        max_rows: usize,
        want_fields: bool,
    ) -> Result<QueryResult, SqlError>;

    /// Run a query that must return exactly one row, and map each column
    /// name to the stringified cell value.
    ///
    /// A query affecting more than one row fails with
    /// `SqlError::RowCountMismatch`, like one affecting none.
    fn execute_fetch_map(&mut self, query: &str) -> Result<HashMap<String, String>, SqlError> {
        let result = match self.execute_fetch(query, 1, true) {
            Ok(result) => result,
            Err(SqlError::RowLimitExceeded { rows_affected, .. }) => {
                return Err(SqlError::RowCountMismatch {
                    query: query.to_string(),
                    rows: rows_affected,
                });
            }
            Err(e) => return Err(e),
        };
        let [row] = result.rows.as_slice() else {
            return Err(SqlError::RowCountMismatch {
                query: query.to_string(),
                rows: result.rows.len() as u64,
            });
        };
        if result.fields.len() != row.len() {
            return Err(SqlError::FieldCountMismatch {
                query: query.to_string(),
                fields: result.fields.len(),
                columns: row.len(),
            });
        }
        Ok(result
            .fields
            .iter()
            .zip(row)
            .map(|(field, value)| (field.name.clone(), value.to_string()))
            .collect())
    }

    /// Start streaming `query` and return the number of rows it reports as
    /// affected. Rows are then pulled with [`fetch_next`], and the fields
    /// are available from [`fields`] without reading any row.
    ///
    /// [`fetch_next`]: DbConnection::fetch_next
    /// [`fields`]: DbConnection::fields
    fn execute_stream_fetch(&mut self, query: &str) -> Result<u64, SqlError>;

    /// The next row of the current stream, or `None` once it is exhausted.
    fn fetch_next(&mut self) -> Result<Option<Row>, SqlError>;

    /// Finish the current result set.
    fn close_result(&mut self);

    /// Field descriptions of the current stream, empty when none is open.
    fn fields(&self) -> Vec<Field>;

    fn close(&mut self);

    /// Whether the connection was ever closed.
    fn is_closed(&self) -> bool;

    /// Stop ongoing communication on the underlying socket.
    fn shutdown(&mut self);

    fn id(&self) -> ConnectionId;

    /// Read a raw packet from the server.
    fn read_packet(&mut self) -> Result<Vec<u8>, SqlError>;

    /// Send a raw command to the server.
    fn send_command(&mut self, command: u32, data: &[u8]) -> Result<(), SqlError>;

    /// Current per-session character set variables.
    fn charset(&self) -> Result<Charset, SqlError>;

    fn set_charset(&mut self, charset: Charset) -> Result<(), SqlError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_charset_is_utf8() {
        let charset = Charset::default();
        assert_eq!(charset.client, UTF8_GENERAL_CI);
        assert_eq!(charset.conn, UTF8_GENERAL_CI);
        assert_eq!(charset.server, UTF8_GENERAL_CI);
    }
}
