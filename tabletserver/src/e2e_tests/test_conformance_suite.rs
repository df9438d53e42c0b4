//! The conformance suite against the fake query service, over clean and
//! faulty transports.

use std::sync::Arc;

use crate::conformance::{FakeQueryService, fixtures, run_suite};
use crate::queryservice::{QueryServiceError, QueryStream};
use crate::tabletconn::{LoopbackConn, TabletConn};
use crate::types::{
    BindVariables, BoundQuery, QueryResult, QueryResultList, QuerySplit, TransactionId,
};

async fn dial(service: &Arc<FakeQueryService>) -> LoopbackConn<FakeQueryService> {
    LoopbackConn::dial(Arc::clone(service), fixtures::KEYSPACE, fixtures::SHARD)
        .await
        .unwrap()
}

/// What a faulty transport does to the traffic it carries.
#[derive(Clone, Copy)]
enum Fault {
    /// Rewrites the sql of outgoing `Execute` requests.
    MangleRequests,
    /// Drops a row from incoming `Execute` replies.
    MangleReplies,
    /// Fails every `ExecuteBatch` call.
    FailBatch,
}

struct FaultyConn<C> {
    inner: C,
    fault: Fault,
}

impl<C: TabletConn> TabletConn for FaultyConn<C> {
    async fn begin(&self) -> Result<TransactionId, QueryServiceError> {
        self.inner.begin().await
    }

    async fn commit(&self, tx_id: TransactionId) -> Result<(), QueryServiceError> {
        self.inner.commit(tx_id).await
    }

    async fn rollback(&self, tx_id: TransactionId) -> Result<(), QueryServiceError> {
        self.inner.rollback(tx_id).await
    }

    async fn execute(
        &self,
        sql: &str,
        bind_variables: BindVariables,
        tx_id: TransactionId,
    ) -> Result<QueryResult, QueryServiceError> {
        match self.fault {
            Fault::MangleRequests => {
                let mangled = format!("{sql}!");
                self.inner.execute(&mangled, bind_variables, tx_id).await
            }
            Fault::MangleReplies => {
                let mut result = self.inner.execute(sql, bind_variables, tx_id).await?;
                result.rows.pop();
                Ok(result)
            }
            Fault::FailBatch => self.inner.execute(sql, bind_variables, tx_id).await,
        }
    }

    async fn execute_batch(
        &self,
        queries: Vec<BoundQuery>,
        tx_id: TransactionId,
    ) -> Result<QueryResultList, QueryServiceError> {
        if matches!(self.fault, Fault::FailBatch) {
            return Err(QueryServiceError::StreamTruncated);
        }
        self.inner.execute_batch(queries, tx_id).await
    }

    async fn stream_execute(
        &self,
        sql: &str,
        bind_variables: BindVariables,
        tx_id: TransactionId,
    ) -> Result<QueryStream, QueryServiceError> {
        self.inner.stream_execute(sql, bind_variables, tx_id).await
    }

    async fn split_query(
        &self,
        query: BoundQuery,
        split_count: u32,
    ) -> Result<Vec<QuerySplit>, QueryServiceError> {
        self.inner.split_query(query, split_count).await
    }
}

#[tokio::test]
async fn test_suite_passes_over_loopback() {
    let service = Arc::new(FakeQueryService::new());
    let conn = dial(&service).await;

    let report = run_suite(&conn).await;
    assert!(report.is_ok(), "{report:?}");
    assert!(service.take_mismatches().is_empty());
}

#[tokio::test]
async fn test_mangled_request_is_caught_by_service() {
    let service = Arc::new(FakeQueryService::new());
    let conn = FaultyConn {
        inner: dial(&service).await,
        fault: Fault::MangleRequests,
    };

    let report = run_suite(&conn).await;
    // The fake still answers with the canned reply.
    assert!(report.is_ok(), "{report:?}");

    let mismatches = service.take_mismatches();
    assert_eq!(mismatches.len(), 1);
    assert!(mismatches[0].contains("Execute.Query.Sql"));
    assert!(mismatches[0].contains("executeQuery!"));
}

#[tokio::test]
async fn test_mangled_reply_is_caught_by_suite() {
    let service = Arc::new(FakeQueryService::new());
    let conn = FaultyConn {
        inner: dial(&service).await,
        fault: Fault::MangleReplies,
    };

    let report = run_suite(&conn).await;
    assert_eq!(report.fatal, None);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].starts_with("Unexpected result from Execute"));
    assert!(service.take_mismatches().is_empty());
}

#[tokio::test]
async fn test_failed_call_stops_the_suite() {
    let service = Arc::new(FakeQueryService::new());
    let conn = FaultyConn {
        inner: dial(&service).await,
        fault: Fault::FailBatch,
    };

    let report = run_suite(&conn).await;
    assert!(!report.is_ok());
    let fatal = report.fatal.unwrap();
    assert!(fatal.starts_with("ExecuteBatch failed"), "{fatal}");
}

#[tokio::test]
async fn test_wrong_target_is_recorded() {
    let service = Arc::new(FakeQueryService::new());
    let conn = LoopbackConn::dial(Arc::clone(&service), "other_keyspace", fixtures::SHARD)
        .await
        .unwrap();
    assert_eq!(conn.session_id(), fixtures::SESSION_ID);

    let mismatches = service.take_mismatches();
    assert_eq!(mismatches.len(), 1);
    assert!(mismatches[0].contains("other_keyspace"));
}
