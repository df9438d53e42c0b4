//! ID types for sessions, transactions and connections.
//!
//! This module provides newtype wrappers for the integer identifiers that
//! travel on the query service protocol, so a session id can never be passed
//! where a transaction id is expected.

use std::fmt;

/// Identifier of an established session.
///
/// Issued by `GetSessionId` and echoed back on every later request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of a transaction.
///
/// # Invariants
///
/// - `TransactionId::NONE` (zero) means "no transaction" on the wire and is
///   never issued by `Begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TransactionId(pub i64);

impl TransactionId {
    /// The id sent when a request runs outside of any transaction.
    pub const NONE: Self = Self(0);

    /// Whether this id refers to no transaction at all.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TransactionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of a driver connection, stable for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub i64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
