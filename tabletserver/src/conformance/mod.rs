//! Conformance suite for `TabletConn` / `QueryService` pairs.
//!
//! [`run_suite`] drives a connection through every protocol operation with
//! fixed requests and checks the replies against fixed expectations. Pair it
//! with a connection that reaches a [`FakeQueryService`]: the service checks
//! the requests it receives, the suite checks the replies that come back, so
//! together they catch corruption in either direction.
//!
//! A reply that differs from the fixture is recorded and the suite goes on.
//! A call that fails outright is fatal and stops the suite.

pub mod fixtures;
mod service;

use futures::StreamExt;

pub use service::FakeQueryService;

use crate::queryservice::{QueryStream, StreamEvent};
use crate::tabletconn::TabletConn;
use crate::types::QueryResult;

/// Outcome of one suite run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    /// Replies that differed from the fixtures, in the order seen.
    pub failures: Vec<String>,
    /// The call that stopped the suite, if any.
    pub fatal: Option<String>,
}

impl SuiteReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty() && self.fatal.is_none()
    }

    fn check<T: PartialEq + std::fmt::Debug>(&mut self, what: &str, got: &T, wanted: &T) {
        if got != wanted {
            let failure = format!("Unexpected result from {what}: got {got:?} wanted {wanted:?}");
            tracing::warn!("{failure}");
            self.failures.push(failure);
        }
    }
}

/// Run every check against `conn` in protocol order.
pub async fn run_suite(conn: &impl TabletConn) -> SuiteReport {
    let mut report = SuiteReport::default();
    if let Err(fatal) = run_checks(conn, &mut report).await {
        tracing::error!("{fatal}");
        report.fatal = Some(fatal);
    }
    report
}

async fn run_checks(conn: &impl TabletConn, report: &mut SuiteReport) -> Result<(), String> {
    tracing::debug!("testBegin");
    let tx_id = conn
        .begin()
        .await
        .map_err(|e| format!("Begin failed: {e}"))?;
    report.check("Begin", &tx_id, &fixtures::BEGIN_TRANSACTION_ID);

    tracing::debug!("testCommit");
    conn.commit(fixtures::COMMIT_TRANSACTION_ID)
        .await
        .map_err(|e| format!("Commit failed: {e}"))?;

    tracing::debug!("testRollback");
    conn.rollback(fixtures::ROLLBACK_TRANSACTION_ID)
        .await
        .map_err(|e| format!("Rollback failed: {e}"))?;

    tracing::debug!("testExecute");
    let result = conn
        .execute(
            fixtures::EXECUTE_QUERY,
            fixtures::execute_bind_vars(),
            fixtures::EXECUTE_TRANSACTION_ID,
        )
        .await
        .map_err(|e| format!("Execute failed: {e}"))?;
    report.check("Execute", &result, &fixtures::execute_query_result());

    tracing::debug!("testStreamExecute");
    let mut stream = conn
        .stream_execute(
            fixtures::STREAM_EXECUTE_QUERY,
            fixtures::stream_execute_bind_vars(),
            fixtures::STREAM_EXECUTE_TRANSACTION_ID,
        )
        .await
        .map_err(|e| format!("StreamExecute failed: {e}"))?;
    let header = next_fragment(&mut stream, "result1").await?;
    report.check("StreamExecute result1", &header, &fixtures::stream_execute_header());
    let rows = next_fragment(&mut stream, "result2").await?;
    report.check("StreamExecute result2", &rows, &fixtures::stream_execute_rows());
    match stream.next().await {
        Some(StreamEvent::Done) => {}
        Some(StreamEvent::Error(e)) => return Err(format!("StreamExecute failed: {e}")),
        Some(StreamEvent::Fragment(_)) => {
            return Err("StreamExecute stream wasn't closed".to_string());
        }
        None => return Err("StreamExecute ended without a status".to_string()),
    }

    tracing::debug!("testExecuteBatch");
    let list = conn
        .execute_batch(
            fixtures::execute_batch_queries(),
            fixtures::EXECUTE_BATCH_TRANSACTION_ID,
        )
        .await
        .map_err(|e| format!("ExecuteBatch failed: {e}"))?;
    report.check("ExecuteBatch", &list, &fixtures::execute_batch_result_list());

    tracing::debug!("testSplitQuery");
    let splits = conn
        .split_query(
            fixtures::split_query_bound_query(),
            fixtures::SPLIT_QUERY_SPLIT_COUNT,
        )
        .await
        .map_err(|e| format!("SplitQuery failed: {e}"))?;
    report.check("SplitQuery", &splits, &fixtures::split_query_splits());

    Ok(())
}

async fn next_fragment(stream: &mut QueryStream, name: &str) -> Result<QueryResult, String> {
    match stream.next().await {
        Some(StreamEvent::Fragment(fragment)) => Ok(fragment),
        Some(StreamEvent::Error(e)) => Err(format!("StreamExecute failed reading {name}: {e}")),
        Some(StreamEvent::Done) | None => {
            Err(format!("StreamExecute failed: cannot read {name}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_is_ok() {
        let mut report = SuiteReport::default();
        assert!(report.is_ok());

        report.check("Begin", &1, &1);
        assert!(report.is_ok());

        report.check("Begin", &1, &2);
        assert!(!report.is_ok());
        assert_eq!(report.failures, vec!["Unexpected result from Begin: got 1 wanted 2"]);
    }

    #[test]
    fn test_fatal_report_is_not_ok() {
        let report = SuiteReport {
            failures: Vec::new(),
            fatal: Some("Begin failed: boom".to_string()),
        };
        assert!(!report.is_ok());
    }
}
