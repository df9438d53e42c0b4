//! Streaming execution: fragment shape, batching and termination.

use futures::StreamExt;

use crate::config::TabletConfig;
use crate::e2e_tests::helpers::*;
use crate::queryservice::{QueryServiceError, StreamEvent};
use crate::tabletconn::TabletConn;
use crate::types::{BindVariables, Field, TransactionId};

#[test]
fn test_fields_then_rows_then_done() {
    let test = TestTablet::new();
    test.db.add_query("select id from t", &int_rows(3));

    let events = test.stream("select id from t", TransactionId::NONE).unwrap();
    let fragments = completed_fragments(events);
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].fields, vec![Field::new("id", 8)]);
    assert!(fragments[0].rows.is_empty());
    assert!(fragments[1].fields.is_empty());
    assert_eq!(fragments[1].rows, int_rows(3).rows);
}

#[test]
fn test_rows_are_batched() {
    let test = TestTablet::with_config(&TabletConfig {
        stream_batch_rows: 4,
        ..TabletConfig::default()
    });
    test.db.add_query("select id from t", &int_rows(10));

    let events = test.stream("select id from t", TransactionId::NONE).unwrap();
    let fragments = completed_fragments(events);
    let sizes: Vec<usize> = fragments.iter().map(|f| f.rows.len()).collect();
    assert_eq!(sizes, vec![0, 4, 4, 2]);

    let streamed: Vec<_> = fragments.into_iter().flat_map(|f| f.rows).collect();
    assert_eq!(streamed, int_rows(10).rows);
}

#[test]
fn test_stream_in_transaction() {
    let test = TestTablet::new();
    test.db.add_query("select id from t", &int_rows(2));
    let tx = test.begin().unwrap();

    let fragments = completed_fragments(test.stream("select id from t", tx).unwrap());
    assert_eq!(fragments[1].rows.len(), 2);
    test.commit(tx).unwrap();
}

#[test]
fn test_validation_fails_before_streaming() {
    let test = TestTablet::new();
    assert!(is_violation(&test.stream("select 1", TransactionId(42))));
}

#[test]
fn test_extra_rows_end_with_error() {
    let test = TestTablet::new();
    let mut result = int_rows(3);
    result.rows_affected = 1;
    test.db.add_query("select id from t", &result);

    let events = test.stream("select id from t", TransactionId::NONE).unwrap();
    assert!(matches!(events.first(), Some(StreamEvent::Fragment(_))));
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Error(QueryServiceError::InconsistentResult(_)))
    ));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[test]
fn test_dropping_a_stream_cancels_it() {
    let test = TestTablet::with_config(&TabletConfig {
        stream_batch_rows: 1,
        ..TabletConfig::default()
    });
    test.db.add_query("select id from t", &int_rows(100));

    test.runtime.block_on(async {
        let mut stream = test
            .conn
            .stream_execute("select id from t", BindVariables::new(), TransactionId::NONE)
            .await
            .unwrap();
        assert!(matches!(stream.next().await, Some(StreamEvent::Fragment(_))));
        assert!(matches!(stream.next().await, Some(StreamEvent::Fragment(_))));
        drop(stream);
    });

    // The server is still fully usable.
    let events = test.stream("select id from t", TransactionId::NONE).unwrap();
    let fragments = completed_fragments(events);
    assert_eq!(fragments.len(), 101);
}
