//! Common helpers for end-to-end tests.

use std::sync::Arc;

use futures::StreamExt;

use crate::config::TabletConfig;
use crate::fakesqldb::FakeDb;
use crate::queryservice::{QueryServiceError, StreamEvent, TabletServer};
use crate::sqldb::{DriverRegistry, SequentialIdSource};
use crate::tabletconn::{LoopbackConn, TabletConn};
use crate::types::{
    BindVariables, BoundQuery, Field, QueryResult, QueryResultList, QuerySplit, TransactionId,
    Value,
};

/// A tablet server over a fresh fake database, reached through a loopback
/// connection.
pub struct TestTablet {
    pub db: Arc<FakeDb>,
    pub server: Arc<TabletServer>,
    pub conn: LoopbackConn<TabletServer>,
    pub runtime: tokio::runtime::Runtime,
}

impl TestTablet {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&TabletConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &TabletConfig) -> Self {
        let db = FakeDb::with_id_source(Arc::new(SequentialIdSource::default()));
        let drivers = Arc::new(DriverRegistry::new());
        let name = db.register(&drivers);
        let server = Arc::new(TabletServer::new(config, drivers, name));

        #[allow(clippy::expect_used)]
        let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
        #[allow(clippy::expect_used)]
        let conn = runtime
            .block_on(LoopbackConn::dial(
                Arc::clone(&server),
                &config.keyspace,
                &config.shard,
            ))
            .expect("Failed to dial test tablet");

        Self {
            db,
            server,
            conn,
            runtime,
        }
    }

    pub fn begin(&self) -> Result<TransactionId, QueryServiceError> {
        self.runtime.block_on(self.conn.begin())
    }

    pub fn commit(&self, tx_id: TransactionId) -> Result<(), QueryServiceError> {
        self.runtime.block_on(self.conn.commit(tx_id))
    }

    pub fn rollback(&self, tx_id: TransactionId) -> Result<(), QueryServiceError> {
        self.runtime.block_on(self.conn.rollback(tx_id))
    }

    pub fn execute(
        &self,
        sql: &str,
        tx_id: TransactionId,
    ) -> Result<QueryResult, QueryServiceError> {
        self.runtime
            .block_on(self.conn.execute(sql, BindVariables::new(), tx_id))
    }

    pub fn execute_batch(
        &self,
        sqls: &[&str],
        tx_id: TransactionId,
    ) -> Result<QueryResultList, QueryServiceError> {
        let queries = sqls.iter().map(|sql| BoundQuery::new(*sql)).collect();
        self.runtime
            .block_on(self.conn.execute_batch(queries, tx_id))
    }

    /// Open a stream and collect every event it yields.
    pub fn stream(
        &self,
        sql: &str,
        tx_id: TransactionId,
    ) -> Result<Vec<StreamEvent>, QueryServiceError> {
        self.runtime.block_on(async {
            let stream = self
                .conn
                .stream_execute(sql, BindVariables::new(), tx_id)
                .await?;
            Ok(stream.collect().await)
        })
    }

    pub fn split(
        &self,
        query: BoundQuery,
        split_count: u32,
    ) -> Result<Vec<QuerySplit>, QueryServiceError> {
        self.runtime
            .block_on(self.conn.split_query(query, split_count))
    }
}

/// A single-column integer result with rows `0..n`.
#[must_use]
pub fn int_rows(n: i64) -> QueryResult {
    QueryResult::from_rows(
        vec![Field::new("id", 8)],
        (0..n).map(|i| vec![Value::Int(i)]).collect(),
    )
}

/// The fragments of a stream that ended in `Done`.
///
/// # Panics
///
/// Panics if the last event is not `Done`.
#[must_use]
pub fn completed_fragments(events: Vec<StreamEvent>) -> Vec<QueryResult> {
    assert_eq!(events.last(), Some(&StreamEvent::Done), "stream did not complete");
    events
        .into_iter()
        .filter_map(|event| match event {
            StreamEvent::Fragment(fragment) => Some(fragment),
            StreamEvent::Done | StreamEvent::Error(_) => None,
        })
        .collect()
}

#[must_use]
pub fn is_violation<T>(result: &Result<T, QueryServiceError>) -> bool {
    matches!(result, Err(QueryServiceError::ProtocolViolation(_)))
}
