//! Request and response shapes of the query service protocol.
//!
//! Field names are stable across transports. Sequences are order-significant;
//! bind variable maps are not.

use crate::types::{BoundQuery, BindVariables, QueryResult, QuerySplit, SessionId, TransactionId};

/// Target of a session-establishment call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionParams {
    pub keyspace: String,
    pub shard: String,
}

/// Reply to a session-establishment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionInfo {
    pub session_id: SessionId,
}

/// Session context sent on `Begin`, `Commit` and `Rollback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    pub session_id: SessionId,
    pub transaction_id: TransactionId,
}

/// Reply to `Begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionInfo {
    pub transaction_id: TransactionId,
}

/// A single query with its session context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub sql: String,
    pub bind_variables: BindVariables,
    pub session_id: SessionId,
    pub transaction_id: TransactionId,
}

/// A batch of queries sharing one session context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryList {
    pub queries: Vec<BoundQuery>,
    pub session_id: SessionId,
    pub transaction_id: TransactionId,
}

/// Reply to `ExecuteBatch`, one result per query in request order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResultList {
    pub list: Vec<QueryResult>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitQueryRequest {
    pub query: BoundQuery,
    /// Upper bound on the number of splits returned.
    pub split_count: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitQueryResult {
    pub queries: Vec<QuerySplit>,
}
