//! The tablet query service protocol.
//!
//! [`QueryService`] is the server side of the protocol: session
//! establishment, the transaction lifecycle, single, batch and streaming
//! execution, and query splitting. [`TabletServer`] implements it on top of
//! driver connections from a [`DriverRegistry`](crate::sqldb::DriverRegistry).
//!
//! # Request Lifecycle
//!
//! 1. `GetSessionId` checks the keyspace/shard target and returns the session id
//! 2. `Begin` issues a transaction id (optional; id 0 runs outside a transaction)
//! 3. `Execute` / `ExecuteBatch` / `StreamExecute` run queries under the ids
//! 4. `Commit` or `Rollback` consumes the transaction id

mod error;
mod server;
pub mod split;
pub mod stream;

pub use error::QueryServiceError;
pub use server::TabletServer;
pub use stream::{QueryStream, StreamEvent};

use crate::types::{
    Query, QueryList, QueryResult, QueryResultList, Session, SessionInfo, SessionParams,
    SplitQueryRequest, SplitQueryResult, TransactionInfo,
};

/// Server side of the tablet query protocol.
#[allow(async_fn_in_trait)]
pub trait QueryService {
    /// Establish a session for a keyspace/shard target.
    async fn get_session_id(&self, params: &SessionParams)
    -> Result<SessionInfo, QueryServiceError>;

    /// Start a transaction. `session.transaction_id` must be 0.
    async fn begin(&self, session: &Session) -> Result<TransactionInfo, QueryServiceError>;

    /// Commit `session.transaction_id`.
    async fn commit(&self, session: &Session) -> Result<(), QueryServiceError>;

    /// Roll back `session.transaction_id`.
    async fn rollback(&self, session: &Session) -> Result<(), QueryServiceError>;

    async fn execute(&self, query: &Query) -> Result<QueryResult, QueryServiceError>;

    /// Start streaming a query.
    ///
    /// Request validation errors are returned here; errors found once rows
    /// are flowing end the stream with [`StreamEvent::Error`].
    async fn stream_execute(&self, query: &Query) -> Result<QueryStream, QueryServiceError>;

    /// Execute queries in order, one result per query.
    ///
    /// There is no atomicity across the batch.
    async fn execute_batch(
        &self,
        query_list: &QueryList,
    ) -> Result<QueryResultList, QueryServiceError>;

    /// Split a query into at most `request.split_count` partitions.
    async fn split_query(
        &self,
        request: &SplitQueryRequest,
    ) -> Result<SplitQueryResult, QueryServiceError>;
}
