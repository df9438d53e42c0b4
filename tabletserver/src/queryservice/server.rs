//! [`QueryService`] over driver connections.
//!
//! Queries outside a transaction run on a fresh connection that is closed
//! afterwards. `Begin` pins a connection to the new transaction id and every
//! query under that id runs on it until `Commit` or `Rollback` releases it.
//! A stream under a transaction borrows the pinned connection until the
//! stream ends or is dropped; other queries in that transaction are refused
//! meanwhile.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{StreamExt, stream};

use crate::config::TabletConfig;
use crate::queryservice::{QueryService, QueryServiceError, QueryStream, StreamEvent, split};
use crate::session::SessionContext;
use crate::sqldb::{DbConnection, DriverRegistry, SqlError};
use crate::transaction::TransactionCoordinator;
use crate::types::{
    Query, QueryList, QueryResult, QueryResultList, Session, SessionId, SessionInfo,
    SessionParams, SplitQueryRequest, SplitQueryResult, TransactionId, TransactionInfo,
};

/// Where a transaction's connection is.
enum TxSlot {
    Idle(Box<dyn DbConnection>),
    /// Lent to an open stream.
    Streaming,
}

type TxConnections = Mutex<HashMap<TransactionId, TxSlot>>;

/// A tablet serving one keyspace/shard from a registered driver.
pub struct TabletServer {
    sessions: SessionContext,
    transactions: TransactionCoordinator,
    drivers: Arc<DriverRegistry>,
    driver_name: String,
    max_result_rows: usize,
    stream_batch_rows: usize,
    tx_connections: Arc<TxConnections>,
}

impl TabletServer {
    #[must_use]
    pub fn new(
        config: &TabletConfig,
        drivers: Arc<DriverRegistry>,
        driver_name: impl Into<String>,
    ) -> Self {
        Self {
            sessions: SessionContext::new(&config.keyspace, &config.shard, config.session_id),
            transactions: TransactionCoordinator::new(),
            drivers,
            driver_name: driver_name.into(),
            max_result_rows: config.max_result_rows,
            stream_batch_rows: config.stream_batch_rows.max(1),
            tx_connections: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of transactions currently holding a connection.
    pub fn open_transactions(&self) -> Result<usize, QueryServiceError> {
        Ok(self.tx_connections()?.len())
    }

    fn tx_connections(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<TransactionId, TxSlot>>, QueryServiceError> {
        self.tx_connections
            .lock()
            .map_err(|_| QueryServiceError::LockPoisoned)
    }

    fn connect(&self) -> Result<Box<dyn DbConnection>, QueryServiceError> {
        Ok(self.drivers.connect(&self.driver_name)?)
    }

    fn check_context(
        &self,
        session_id: SessionId,
        tx_id: TransactionId,
    ) -> Result<(), QueryServiceError> {
        self.sessions.validate(session_id)?;
        self.transactions.validate(session_id, tx_id)
    }

    /// Run `sql` on the connection for `tx_id`, or on a one-off connection
    /// when there is no transaction.
    fn fetch(&self, tx_id: TransactionId, sql: &str) -> Result<QueryResult, QueryServiceError> {
        if tx_id.is_none() {
            let mut conn = self.connect()?;
            let result = conn.execute_fetch(sql, self.max_result_rows, true);
            conn.close();
            return Ok(result?);
        }

        let mut connections = self.tx_connections()?;
        match connections.get_mut(&tx_id) {
            Some(TxSlot::Idle(conn)) => Ok(conn.execute_fetch(sql, self.max_result_rows, true)?),
            Some(TxSlot::Streaming) => Err(busy_streaming(tx_id)),
            None => Err(no_connection(tx_id)),
        }
    }

    /// Take the connection of `tx_id` for a stream, leaving its slot marked
    /// as streaming.
    fn lend(&self, tx_id: TransactionId) -> Result<Box<dyn DbConnection>, QueryServiceError> {
        let mut connections = self.tx_connections()?;
        let slot = connections
            .get_mut(&tx_id)
            .ok_or_else(|| no_connection(tx_id))?;
        match std::mem::replace(slot, TxSlot::Streaming) {
            TxSlot::Idle(conn) => Ok(conn),
            TxSlot::Streaming => Err(busy_streaming(tx_id)),
        }
    }

    /// Forget the connection of `tx_id` and close it. A lent connection is
    /// closed by its stream instead.
    fn release(&self, tx_id: TransactionId) -> Result<(), QueryServiceError> {
        let slot = self.tx_connections()?.remove(&tx_id);
        if let Some(TxSlot::Idle(mut conn)) = slot {
            conn.close();
        }
        Ok(())
    }

    fn open_stream(&self, query: &Query) -> Result<(RowPump, QueryResult), QueryServiceError> {
        let tx_id = query.transaction_id;
        let (conn, owner) = if tx_id.is_none() {
            (self.connect()?, None)
        } else {
            (
                self.lend(tx_id)?,
                Some((tx_id, Arc::clone(&self.tx_connections))),
            )
        };
        let mut pump = RowPump {
            conn: Some(conn),
            owner,
            batch_rows: self.stream_batch_rows,
            expected_rows: 0,
            streamed_rows: 0,
            exhausted: false,
            sql: query.sql.clone(),
        };
        let header = pump.open()?;
        Ok((pump, header))
    }
}

fn no_connection(tx_id: TransactionId) -> QueryServiceError {
    QueryServiceError::ProtocolViolation(format!("transaction {tx_id} has no connection"))
}

fn busy_streaming(tx_id: TransactionId) -> QueryServiceError {
    QueryServiceError::ProtocolViolation(format!("transaction {tx_id} is busy streaming"))
}

fn log_rejection(operation: &str, error: &QueryServiceError) {
    match error {
        QueryServiceError::ProtocolViolation(_) | QueryServiceError::InvalidArgument(_) => {
            tracing::warn!("{operation} rejected: {error}");
        }
        _ => tracing::debug!("{operation} failed: {error}"),
    }
}

impl QueryService for TabletServer {
    async fn get_session_id(
        &self,
        params: &SessionParams,
    ) -> Result<SessionInfo, QueryServiceError> {
        let session_id = self
            .sessions
            .get_session_id(params)
            .inspect_err(|e| log_rejection("GetSessionId", e))?;
        tracing::debug!(
            "session {session_id} established for {}/{}",
            params.keyspace,
            params.shard
        );
        Ok(SessionInfo { session_id })
    }

    async fn begin(&self, session: &Session) -> Result<TransactionInfo, QueryServiceError> {
        let transaction_id = self
            .sessions
            .validate(session.session_id)
            .and_then(|()| self.transactions.begin(session))
            .inspect_err(|e| log_rejection("Begin", e))?;
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(e) => {
                log_rejection("Begin", &e);
                self.transactions.rollback(&Session {
                    session_id: session.session_id,
                    transaction_id,
                })?;
                return Err(e);
            }
        };
        self.tx_connections()?.insert(transaction_id, TxSlot::Idle(conn));
        Ok(TransactionInfo { transaction_id })
    }

    async fn commit(&self, session: &Session) -> Result<(), QueryServiceError> {
        self.sessions
            .validate(session.session_id)
            .and_then(|()| self.transactions.commit(session))
            .inspect_err(|e| log_rejection("Commit", e))?;
        self.release(session.transaction_id)
    }

    async fn rollback(&self, session: &Session) -> Result<(), QueryServiceError> {
        self.sessions
            .validate(session.session_id)
            .and_then(|()| self.transactions.rollback(session))
            .inspect_err(|e| log_rejection("Rollback", e))?;
        self.release(session.transaction_id)
    }

    async fn execute(&self, query: &Query) -> Result<QueryResult, QueryServiceError> {
        self.check_context(query.session_id, query.transaction_id)
            .and_then(|()| self.fetch(query.transaction_id, &query.sql))
            .inspect_err(|e| log_rejection("Execute", e))
    }

    async fn stream_execute(&self, query: &Query) -> Result<QueryStream, QueryServiceError> {
        let (pump, header) = self
            .check_context(query.session_id, query.transaction_id)
            .and_then(|()| self.open_stream(query))
            .inspect_err(|e| log_rejection("StreamExecute", e))?;

        let header = stream::iter([StreamEvent::Fragment(header)]);
        let rows = stream::unfold(Some(pump), |state| async move {
            let mut pump = state?;
            let event = pump.next_event();
            let next = if event.is_terminal() { None } else { Some(pump) };
            Some((event, next))
        });
        Ok(QueryStream::new(header.chain(rows)))
    }

    async fn execute_batch(
        &self,
        query_list: &QueryList,
    ) -> Result<QueryResultList, QueryServiceError> {
        let tx_id = query_list.transaction_id;
        self.check_context(query_list.session_id, tx_id)
            .inspect_err(|e| log_rejection("ExecuteBatch", e))?;
        let list = query_list
            .queries
            .iter()
            .map(|query| self.fetch(tx_id, &query.sql))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| log_rejection("ExecuteBatch", e))?;
        Ok(QueryResultList { list })
    }

    async fn split_query(
        &self,
        request: &SplitQueryRequest,
    ) -> Result<SplitQueryResult, QueryServiceError> {
        let mut conn = self.connect()?;
        let estimate = conn.execute_stream_fetch(&request.query.sql);
        conn.close();
        let estimated_rows = estimate?;

        let queries = split::split_query(&request.query, request.split_count, estimated_rows)
            .inspect_err(|e| log_rejection("SplitQuery", e))?;
        tracing::debug!(
            "split {:?} into {} queries over {estimated_rows} rows",
            request.query.sql,
            queries.len()
        );
        Ok(SplitQueryResult { queries })
    }
}

impl std::fmt::Debug for TabletServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabletServer")
            .field("sessions", &self.sessions)
            .field("driver_name", &self.driver_name)
            .field("max_result_rows", &self.max_result_rows)
            .field("stream_batch_rows", &self.stream_batch_rows)
            .finish_non_exhaustive()
    }
}

/// Pulls rows off a streaming connection in batches.
///
/// The pump is dropped after the terminal event or when the consumer drops
/// the stream early. A one-off connection is closed then; a transaction's
/// connection goes back to its slot, or is closed if the transaction ended
/// meanwhile.
struct RowPump {
    /// `Some` until the pump is dropped.
    conn: Option<Box<dyn DbConnection>>,
    owner: Option<(TransactionId, Arc<TxConnections>)>,
    batch_rows: usize,
    expected_rows: u64,
    streamed_rows: u64,
    exhausted: bool,
    sql: String,
}

impl RowPump {
    /// Start the query and build the header fragment from its fields.
    fn open(&mut self) -> Result<QueryResult, SqlError> {
        let conn = self.conn.as_mut().ok_or(SqlError::ConnectionClosed)?;
        self.expected_rows = conn.execute_stream_fetch(&self.sql)?;
        Ok(QueryResult {
            fields: conn.fields(),
            ..QueryResult::default()
        })
    }

    fn next_event(&mut self) -> StreamEvent {
        let Some(conn) = self.conn.as_mut() else {
            return StreamEvent::Error(SqlError::ConnectionClosed.into());
        };
        let mut batch = Vec::new();
        while !self.exhausted && batch.len() < self.batch_rows {
            match conn.fetch_next() {
                Ok(Some(row)) => batch.push(row),
                Ok(None) => self.exhausted = true,
                Err(e) => return StreamEvent::Error(e.into()),
            }
        }

        if !batch.is_empty() {
            self.streamed_rows += batch.len() as u64;
            return StreamEvent::Fragment(QueryResult::rows_fragment(batch));
        }
        if self.streamed_rows != self.expected_rows {
            return StreamEvent::Error(QueryServiceError::InconsistentResult(format!(
                "query {:?} streamed {} rows but reports {} rows affected",
                self.sql, self.streamed_rows, self.expected_rows
            )));
        }
        StreamEvent::Done
    }
}

impl Drop for RowPump {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        if let Some((tx_id, connections)) = self.owner.take() {
            let mut connections = connections
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = connections.get_mut(&tx_id) {
                conn.close_result();
                *slot = TxSlot::Idle(conn);
                return;
            }
        }
        conn.close();
    }
}
