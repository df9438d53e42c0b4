//! Client side of the tablet query protocol.
//!
//! A [`TabletConn`] is bound to one session: callers pass only transaction
//! ids and statements, and the connection fills in the session context of
//! every request. [`LoopbackConn`] forwards to an in-process
//! [`QueryService`] without any wire format in between.

use std::sync::Arc;

use crate::queryservice::{QueryService, QueryServiceError, QueryStream};
use crate::types::{
    BindVariables, BoundQuery, Query, QueryList, QueryResult, QueryResultList, QuerySplit,
    Session, SessionId, SessionParams, SplitQueryRequest, TransactionId,
};

/// A client connection to one tablet session.
#[allow(async_fn_in_trait)]
pub trait TabletConn {
    async fn begin(&self) -> Result<TransactionId, QueryServiceError>;

    async fn commit(&self, tx_id: TransactionId) -> Result<(), QueryServiceError>;

    async fn rollback(&self, tx_id: TransactionId) -> Result<(), QueryServiceError>;

    async fn execute(
        &self,
        sql: &str,
        bind_variables: BindVariables,
        tx_id: TransactionId,
    ) -> Result<QueryResult, QueryServiceError>;

    async fn execute_batch(
        &self,
        queries: Vec<BoundQuery>,
        tx_id: TransactionId,
    ) -> Result<QueryResultList, QueryServiceError>;

    async fn stream_execute(
        &self,
        sql: &str,
        bind_variables: BindVariables,
        tx_id: TransactionId,
    ) -> Result<QueryStream, QueryServiceError>;

    async fn split_query(
        &self,
        query: BoundQuery,
        split_count: u32,
    ) -> Result<Vec<QuerySplit>, QueryServiceError>;
}

/// In-process connection to a [`QueryService`].
#[derive(Debug)]
pub struct LoopbackConn<S> {
    service: Arc<S>,
    session_id: SessionId,
}

impl<S: QueryService> LoopbackConn<S> {
    /// Open a session on `service` for the given target.
    pub async fn dial(
        service: Arc<S>,
        keyspace: &str,
        shard: &str,
    ) -> Result<Self, QueryServiceError> {
        let info = service
            .get_session_id(&SessionParams {
                keyspace: keyspace.to_string(),
                shard: shard.to_string(),
            })
            .await?;
        tracing::debug!("dialed {keyspace}/{shard}, session {}", info.session_id);
        Ok(Self {
            service,
            session_id: info.session_id,
        })
    }

    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    const fn session(&self, transaction_id: TransactionId) -> Session {
        Session {
            session_id: self.session_id,
            transaction_id,
        }
    }

    fn query(&self, sql: &str, bind_variables: BindVariables, tx_id: TransactionId) -> Query {
        Query {
            sql: sql.to_string(),
            bind_variables,
            session_id: self.session_id,
            transaction_id: tx_id,
        }
    }
}

impl<S: QueryService> TabletConn for LoopbackConn<S> {
    async fn begin(&self) -> Result<TransactionId, QueryServiceError> {
        let info = self
            .service
            .begin(&self.session(TransactionId::NONE))
            .await?;
        Ok(info.transaction_id)
    }

    async fn commit(&self, tx_id: TransactionId) -> Result<(), QueryServiceError> {
        self.service.commit(&self.session(tx_id)).await
    }

    async fn rollback(&self, tx_id: TransactionId) -> Result<(), QueryServiceError> {
        self.service.rollback(&self.session(tx_id)).await
    }

    async fn execute(
        &self,
        sql: &str,
        bind_variables: BindVariables,
        tx_id: TransactionId,
    ) -> Result<QueryResult, QueryServiceError> {
        self.service
            .execute(&self.query(sql, bind_variables, tx_id))
            .await
    }

    async fn execute_batch(
        &self,
        queries: Vec<BoundQuery>,
        tx_id: TransactionId,
    ) -> Result<QueryResultList, QueryServiceError> {
        self.service
            .execute_batch(&QueryList {
                queries,
                session_id: self.session_id,
                transaction_id: tx_id,
            })
            .await
    }

    async fn stream_execute(
        &self,
        sql: &str,
        bind_variables: BindVariables,
        tx_id: TransactionId,
    ) -> Result<QueryStream, QueryServiceError> {
        self.service
            .stream_execute(&self.query(sql, bind_variables, tx_id))
            .await
    }

    async fn split_query(
        &self,
        query: BoundQuery,
        split_count: u32,
    ) -> Result<Vec<QuerySplit>, QueryServiceError> {
        let result = self
            .service
            .split_query(&SplitQueryRequest { query, split_count })
            .await?;
        Ok(result.queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TabletConfig;
    use crate::fakesqldb::FakeDb;
    use crate::queryservice::TabletServer;
    use crate::sqldb::DriverRegistry;
    use crate::types::{Field, Value};

    fn server() -> (Arc<FakeDb>, Arc<TabletServer>) {
        let db = FakeDb::new();
        let drivers = Arc::new(DriverRegistry::new());
        let name = db.register(&drivers);
        let server = TabletServer::new(&TabletConfig::default(), drivers, name);
        (db, Arc::new(server))
    }

    #[tokio::test]
    async fn test_dial_uses_session_id() {
        let (_db, server) = server();
        let conn = LoopbackConn::dial(server, "test_keyspace", "test_shard")
            .await
            .unwrap();
        assert_eq!(conn.session_id(), SessionId(5678));
    }

    #[tokio::test]
    async fn test_dial_wrong_target() {
        let (_db, server) = server();
        let err = LoopbackConn::dial(server, "test_keyspace", "80-")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryServiceError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn test_forwards_requests() {
        let (db, server) = server();
        let result = QueryResult::from_rows(vec![Field::new("v", 1)], vec![vec![Value::Int(7)]]);
        db.add_query("select v", &result);

        let conn = LoopbackConn::dial(server, "test_keyspace", "test_shard")
            .await
            .unwrap();
        let tx = conn.begin().await.unwrap();
        let got = conn
            .execute("select v", BindVariables::new(), tx)
            .await
            .unwrap();
        assert_eq!(got, result);

        let batch = conn
            .execute_batch(vec![BoundQuery::new("select v")], tx)
            .await
            .unwrap();
        assert_eq!(batch.list, vec![result]);
        conn.commit(tx).await.unwrap();
        assert!(conn.rollback(tx).await.is_err());

        let splits = conn
            .split_query(BoundQuery::new("select v"), 3)
            .await
            .unwrap();
        assert_eq!(splits.len(), 1);
    }
}
