/// MySQL client error number reported when a connection cannot be made.
pub const CONNECT_FAIL_ERRNO: u16 = 2012;

/// Errors returned by driver connections and the driver registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    /// The connection was closed before the call.
    ConnectionClosed,
    /// The query affects more rows than the caller allows.
    RowLimitExceeded { max_rows: usize, rows_affected: u64 },
    /// A single-row fetch returned some other number of rows.
    RowCountMismatch { query: String, rows: u64 },
    /// A single-row fetch returned a row whose width differs from its fields.
    FieldCountMismatch {
        query: String,
        fields: usize,
        columns: usize,
    },
    /// The registered result claims more affected rows than it carries.
    ShortResult {
        query: String,
        rows_affected: u64,
        available: usize,
    },
    /// Connecting failed.
    ConnectFail,
    /// No driver is registered under this name.
    UnknownDriver(String),
}

impl SqlError {
    /// The MySQL error number, for errors that have one.
    #[must_use]
    pub const fn errno(&self) -> Option<u16> {
        match self {
            Self::ConnectFail => Some(CONNECT_FAIL_ERRNO),
            _ => None,
        }
    }
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "connection is closed"),
            Self::RowLimitExceeded { max_rows, .. } => write!(f, "row count exceeded {max_rows}"),
            Self::RowCountMismatch { query, rows } => {
                write!(f, "query {query:?} returned {rows} rows, expected 1")
            }
            Self::FieldCountMismatch {
                query,
                fields,
                columns,
            } => write!(
                f,
                "query {query:?} returned {fields} column names, expected {columns}"
            ),
            Self::ShortResult {
                query,
                rows_affected,
                available,
            } => write!(
                f,
                "query {query:?} affects {rows_affected} rows but only {available} are registered"
            ),
            Self::ConnectFail => write!(f, "connection fail (errno {CONNECT_FAIL_ERRNO})"),
            Self::UnknownDriver(name) => write!(f, "unknown driver: {name}"),
        }
    }
}

impl std::error::Error for SqlError {}
