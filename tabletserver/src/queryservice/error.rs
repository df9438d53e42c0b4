use crate::sqldb::SqlError;

/// Errors returned by query service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryServiceError {
    /// A session or transaction id was wrong, reused or out of sequence.
    ProtocolViolation(String),
    /// A request was malformed.
    InvalidArgument(String),
    /// The underlying connection failed.
    Sql(SqlError),
    /// A registered result disagrees with itself, such as a stream whose
    /// row count differs from its rows affected.
    InconsistentResult(String),
    /// A result stream ended without reporting completion.
    StreamTruncated,
    /// A lock guarding server state was poisoned.
    LockPoisoned,
}

impl std::fmt::Display for QueryServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProtocolViolation(message) => write!(f, "protocol violation: {message}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Sql(e) => write!(f, "sql error: {e}"),
            Self::InconsistentResult(message) => write!(f, "inconsistent result: {message}"),
            Self::StreamTruncated => write!(f, "stream ended without a completion status"),
            Self::LockPoisoned => write!(f, "lock poisoned"),
        }
    }
}

impl std::error::Error for QueryServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sql(e) => Some(e),
            Self::ProtocolViolation(_)
            | Self::InvalidArgument(_)
            | Self::InconsistentResult(_)
            | Self::StreamTruncated
            | Self::LockPoisoned => None,
        }
    }
}

impl From<SqlError> for QueryServiceError {
    fn from(e: SqlError) -> Self {
        Self::Sql(e)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            QueryServiceError::ProtocolViolation("bad session".to_string()).to_string(),
            "protocol violation: bad session"
        );
        assert_eq!(
            QueryServiceError::from(SqlError::ConnectionClosed).to_string(),
            "sql error: connection is closed"
        );
    }

    #[test]
    fn test_source() {
        let err = QueryServiceError::Sql(SqlError::ConnectFail);
        assert!(err.source().is_some());
        assert!(QueryServiceError::StreamTruncated.source().is_none());
    }
}
