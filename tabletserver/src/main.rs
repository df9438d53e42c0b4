#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::sync::Arc;

use tabletserver::config::TabletConfig;
use tabletserver::conformance::{FakeQueryService, fixtures, run_suite};
use tabletserver::fakesqldb::FakeDb;
use tabletserver::queryservice::QueryServiceError;
use tabletserver::sqldb::DriverRegistry;
use tabletserver::types::{BindVariables, Field, QueryResult, TransactionId, Value};
use tabletserver::{LoopbackConn, TabletConn, TabletServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabletserver=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match TabletConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: keyspace={}, shard={}, session_id={}",
        config.keyspace,
        config.shard,
        config.session_id
    );

    let mut ok = run_conformance().await;

    if let Err(e) = smoke_test(&config).await {
        tracing::error!("Tablet server smoke test failed: {e}");
        ok = false;
    }

    if !ok {
        std::process::exit(1);
    }
    tracing::info!("all checks passed");
}

/// Run the protocol conformance suite over a loopback connection.
async fn run_conformance() -> bool {
    let service = Arc::new(FakeQueryService::new());
    let dial = LoopbackConn::dial(Arc::clone(&service), fixtures::KEYSPACE, fixtures::SHARD);
    let conn = match dial.await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to dial conformance service: {e}");
            return false;
        }
    };

    let report = run_suite(&conn).await;
    let mismatches = service.take_mismatches();
    for mismatch in &mismatches {
        tracing::error!("request mismatch: {mismatch}");
    }
    for failure in &report.failures {
        tracing::error!("reply mismatch: {failure}");
    }

    let ok = report.is_ok() && mismatches.is_empty();
    if ok {
        tracing::info!("conformance suite passed");
    }
    ok
}

/// Serve a registered query from a fake database through `TabletServer`.
async fn smoke_test(config: &TabletConfig) -> Result<(), QueryServiceError> {
    let db = FakeDb::new();
    let drivers = Arc::new(DriverRegistry::new());
    let driver_name = db.register(&drivers);

    let expected = QueryResult::from_rows(
        vec![Field::new("id", 8)],
        vec![vec![Value::Int(1)], vec![Value::Int(2)]],
    );
    db.add_query("select id from t", &expected);

    let server = Arc::new(TabletServer::new(config, drivers, driver_name));
    let conn = LoopbackConn::dial(server, &config.keyspace, &config.shard).await?;

    let tx = conn.begin().await?;
    let result = conn
        .execute("select id from t", BindVariables::new(), tx)
        .await?;
    conn.commit(tx).await?;

    let fragments = conn
        .stream_execute("select id from t", BindVariables::new(), TransactionId::NONE)
        .await?
        .try_collect_fragments()
        .await?;

    let streamed = fragments.iter().map(|f| f.rows.len()).sum::<usize>();
    if result != expected || streamed != expected.rows.len() {
        return Err(QueryServiceError::InconsistentResult(format!(
            "smoke test got {} rows, streamed {streamed}",
            result.rows.len()
        )));
    }
    tracing::info!("tablet server smoke test passed");
    Ok(())
}
