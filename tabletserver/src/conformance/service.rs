use std::sync::{Mutex, PoisonError};

use crate::conformance::fixtures;
use crate::queryservice::{QueryService, QueryServiceError, QueryStream};
use crate::types::{
    BindVariables, Query, QueryList, QueryResult, QueryResultList, Session, SessionInfo,
    SessionParams, SplitQueryRequest, SplitQueryResult, TransactionId, TransactionInfo,
};

/// A [`QueryService`] that expects the conformance suite's requests.
///
/// Every operation compares its request with the fixture and records a
/// description of each difference, then answers with the fixture reply. It
/// never fails a call, so a client sees the canned replies even when the
/// transport mangled a request; the mismatch list is what tells.
#[derive(Debug, Default)]
pub struct FakeQueryService {
    mismatches: Mutex<Vec<String>>,
}

impl FakeQueryService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every mismatch recorded so far.
    pub fn take_mismatches(&self) -> Vec<String> {
        std::mem::take(
            &mut *self
                .mismatches
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn record(&self, message: String) {
        tracing::warn!("{message}");
        self.mismatches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    fn expect<T: PartialEq + std::fmt::Debug>(&self, what: &str, got: &T, expected: &T) {
        if got != expected {
            self.record(format!("invalid {what}: got {got:?} expected {expected:?}"));
        }
    }

    fn expect_query(
        &self,
        operation: &str,
        query: &Query,
        sql: &str,
        tx_id: TransactionId,
        bind_variables: &BindVariables,
    ) {
        self.expect(&format!("{operation}.Query.Sql"), &query.sql.as_str(), &sql);
        self.expect(
            &format!("{operation}.Query.BindVariables"),
            &query.bind_variables,
            bind_variables,
        );
        self.expect(
            &format!("{operation}.Query.SessionId"),
            &query.session_id,
            &fixtures::SESSION_ID,
        );
        self.expect(
            &format!("{operation}.Query.TransactionId"),
            &query.transaction_id,
            &tx_id,
        );
    }
}

impl QueryService for FakeQueryService {
    async fn get_session_id(
        &self,
        params: &SessionParams,
    ) -> Result<SessionInfo, QueryServiceError> {
        self.expect("keyspace", &params.keyspace.as_str(), &fixtures::KEYSPACE);
        self.expect("shard", &params.shard.as_str(), &fixtures::SHARD);
        Ok(SessionInfo {
            session_id: fixtures::SESSION_ID,
        })
    }

    async fn begin(&self, session: &Session) -> Result<TransactionInfo, QueryServiceError> {
        self.expect("Begin.SessionId", &session.session_id, &fixtures::SESSION_ID);
        self.expect(
            "Begin.TransactionId",
            &session.transaction_id,
            &TransactionId::NONE,
        );
        Ok(TransactionInfo {
            transaction_id: fixtures::BEGIN_TRANSACTION_ID,
        })
    }

    async fn commit(&self, session: &Session) -> Result<(), QueryServiceError> {
        self.expect("Commit.SessionId", &session.session_id, &fixtures::SESSION_ID);
        self.expect(
            "Commit.TransactionId",
            &session.transaction_id,
            &fixtures::COMMIT_TRANSACTION_ID,
        );
        Ok(())
    }

    async fn rollback(&self, session: &Session) -> Result<(), QueryServiceError> {
        self.expect("Rollback.SessionId", &session.session_id, &fixtures::SESSION_ID);
        self.expect(
            "Rollback.TransactionId",
            &session.transaction_id,
            &fixtures::ROLLBACK_TRANSACTION_ID,
        );
        Ok(())
    }

    async fn execute(&self, query: &Query) -> Result<QueryResult, QueryServiceError> {
        self.expect_query(
            "Execute",
            query,
            fixtures::EXECUTE_QUERY,
            fixtures::EXECUTE_TRANSACTION_ID,
            &fixtures::execute_bind_vars(),
        );
        Ok(fixtures::execute_query_result())
    }

    async fn stream_execute(&self, query: &Query) -> Result<QueryStream, QueryServiceError> {
        self.expect_query(
            "StreamExecute",
            query,
            fixtures::STREAM_EXECUTE_QUERY,
            fixtures::STREAM_EXECUTE_TRANSACTION_ID,
            &fixtures::stream_execute_bind_vars(),
        );
        Ok(QueryStream::from_fragments(vec![
            fixtures::stream_execute_header(),
            fixtures::stream_execute_rows(),
        ]))
    }

    async fn execute_batch(
        &self,
        query_list: &QueryList,
    ) -> Result<QueryResultList, QueryServiceError> {
        self.expect(
            "ExecuteBatch.QueryList.Queries",
            &query_list.queries,
            &fixtures::execute_batch_queries(),
        );
        self.expect(
            "ExecuteBatch.QueryList.SessionId",
            &query_list.session_id,
            &fixtures::SESSION_ID,
        );
        self.expect(
            "ExecuteBatch.QueryList.TransactionId",
            &query_list.transaction_id,
            &fixtures::EXECUTE_BATCH_TRANSACTION_ID,
        );
        Ok(fixtures::execute_batch_result_list())
    }

    async fn split_query(
        &self,
        request: &SplitQueryRequest,
    ) -> Result<SplitQueryResult, QueryServiceError> {
        self.expect(
            "SplitQuery.SplitQueryRequest.Query",
            &request.query,
            &fixtures::split_query_bound_query(),
        );
        self.expect(
            "SplitQuery.SplitQueryRequest.SplitCount",
            &request.split_count,
            &fixtures::SPLIT_QUERY_SPLIT_COUNT,
        );
        Ok(SplitQueryResult {
            queries: fixtures::split_query_splits(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionId;

    #[tokio::test]
    async fn test_matching_requests_record_nothing() {
        let service = FakeQueryService::new();
        let info = service
            .get_session_id(&SessionParams {
                keyspace: fixtures::KEYSPACE.to_string(),
                shard: fixtures::SHARD.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(info.session_id, fixtures::SESSION_ID);

        let tx = service
            .begin(&Session {
                session_id: fixtures::SESSION_ID,
                transaction_id: TransactionId::NONE,
            })
            .await
            .unwrap();
        assert_eq!(tx.transaction_id, fixtures::BEGIN_TRANSACTION_ID);
        assert!(service.take_mismatches().is_empty());
    }

    #[tokio::test]
    async fn test_mismatches_are_recorded_not_returned() {
        let service = FakeQueryService::new();
        let reply = service
            .execute(&Query {
                sql: "somethingElse".to_string(),
                bind_variables: fixtures::execute_bind_vars(),
                session_id: SessionId(1),
                transaction_id: fixtures::EXECUTE_TRANSACTION_ID,
            })
            .await
            .unwrap();
        assert_eq!(reply, fixtures::execute_query_result());

        let mismatches = service.take_mismatches();
        assert_eq!(mismatches.len(), 2);
        assert!(mismatches[0].starts_with("invalid Execute.Query.Sql"));
        assert!(mismatches[1].starts_with("invalid Execute.Query.SessionId"));
        assert!(service.take_mismatches().is_empty());
    }
}
