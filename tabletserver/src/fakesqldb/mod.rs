//! In-memory fake database for testing query service implementations.
//!
//! A [`FakeDb`] maps exact query text to a canned [`QueryResult`]. Connections
//! opened on it ([`FakeConn`]) answer `execute_fetch` and streaming fetches
//! from those registrations, enforce row limits, and can be made to fail at
//! connect time.
//!
//! # Thread Safety
//!
//! Every `FakeDb` operation runs under one exclusive lock, so registrations
//! and lookups from concurrent connections are fully serialized.
//!
//! # Invariants
//!
//! - The store keeps its own copy of every registered result; callers may
//!   mutate theirs afterwards without affecting the store.
//! - Query text is the only lookup key. Bind variables play no part.
//! - The connect-fail flag is only consulted when a connection is created.

mod conn;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use conn::FakeConn;

use crate::sqldb::{DbConnection, DriverRegistry, IdSource, RandomIdSource, SqlError};
use crate::types::{ConnectionId, QueryResult};

/// A fake database. All of its methods are thread safe.
pub struct FakeDb {
    state: Mutex<FakeDbState>,
    ids: Arc<dyn IdSource>,
}

#[derive(Default)]
struct FakeDbState {
    conn_fail: bool,
    data: HashMap<String, Arc<QueryResult>>,
}

impl FakeDb {
    /// Create an empty fake database with random connection ids.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_id_source(Arc::new(RandomIdSource))
    }

    /// Create an empty fake database drawing connection ids from `ids`.
    #[must_use]
    pub fn with_id_source(ids: Arc<dyn IdSource>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeDbState::default()),
            ids,
        })
    }

    // The state is plain data, so a panic elsewhere cannot leave it half-updated.
    fn state(&self) -> MutexGuard<'_, FakeDbState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `result` as the answer to `query`, replacing any previous one.
    pub fn add_query(&self, query: &str, result: &QueryResult) {
        let result = Arc::new(result.clone());
        self.state().data.insert(query.to_string(), result);
    }

    /// Look up the result registered for exactly `query`.
    #[must_use]
    pub fn get_query(&self, query: &str) -> Option<Arc<QueryResult>> {
        self.state().data.get(query).cloned()
    }

    /// Remove the registration for `query`. Removing an unknown query is a no-op.
    pub fn delete_query(&self, query: &str) {
        self.state().data.remove(query);
    }

    /// Make every subsequent connection attempt fail.
    pub fn enable_conn_fail(&self) {
        self.state().conn_fail = true;
    }

    /// Let connection attempts succeed again.
    pub fn disable_conn_fail(&self) {
        self.state().conn_fail = false;
    }

    #[must_use]
    pub fn is_conn_fail(&self) -> bool {
        self.state().conn_fail
    }

    /// Result for `query`, or an empty result if nothing is registered.
    fn get_query_or_empty(&self, query: &str) -> Arc<QueryResult> {
        self.get_query(query).unwrap_or_else(|| {
            tracing::warn!("unexpected query: {query}, will return an empty result");
            Arc::new(QueryResult::empty())
        })
    }

    fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.ids.next_id())
    }

    /// Open a connection, failing if connect failures are enabled.
    ///
    /// # Errors
    ///
    /// Returns `SqlError::ConnectFail` while [`enable_conn_fail`] is in effect.
    ///
    /// [`enable_conn_fail`]: FakeDb::enable_conn_fail
    pub fn connect(self: &Arc<Self>) -> Result<FakeConn, SqlError> {
        if self.is_conn_fail() {
            tracing::debug!("fake connect refused: connection failure is enabled");
            return Err(SqlError::ConnectFail);
        }
        let conn = FakeConn::new(Arc::clone(self));
        tracing::debug!("opened fake connection {}", conn.id());
        Ok(conn)
    }

    /// Register this database as a driver in `registry` and return the
    /// generated driver name (`fake-<id>`).
    pub fn register(self: &Arc<Self>, registry: &DriverRegistry) -> String {
        let name = format!("fake-{}", self.ids.next_id());
        let db = Arc::clone(self);
        registry.register(&name, move || {
            db.connect()
                .map(|conn| Box::new(conn) as Box<dyn DbConnection>)
        });
        tracing::info!("Registered fake database as driver '{}'", name);
        name
    }
}
