//! Batch execution.

use crate::e2e_tests::helpers::*;
use crate::queryservice::QueryServiceError;
use crate::sqldb::SqlError;
use crate::types::{QueryResult, TransactionId};

#[test]
fn test_batch_results_follow_request_order() {
    let test = TestTablet::new();
    test.db.add_query("a", &int_rows(1));
    test.db.add_query("b", &int_rows(2));
    test.db.add_query("c", &int_rows(3));

    let list = test
        .execute_batch(&["c", "a", "missing", "b"], TransactionId::NONE)
        .unwrap()
        .list;
    assert_eq!(
        list,
        vec![int_rows(3), int_rows(1), QueryResult::empty(), int_rows(2)]
    );
}

#[test]
fn test_batch_in_transaction() {
    let test = TestTablet::new();
    test.db.add_query("a", &int_rows(1));
    let tx = test.begin().unwrap();
    let list = test.execute_batch(&["a", "a"], tx).unwrap().list;
    assert_eq!(list.len(), 2);
    test.commit(tx).unwrap();
}

#[test]
fn test_batch_stops_at_first_error() {
    let test = TestTablet::new();
    let mut short = int_rows(1);
    short.rows_affected = 2;
    test.db.add_query("ok", &int_rows(1));
    test.db.add_query("short", &short);

    let err = test
        .execute_batch(&["ok", "short", "ok"], TransactionId::NONE)
        .unwrap_err();
    assert!(matches!(
        err,
        QueryServiceError::Sql(SqlError::ShortResult { .. })
    ));
}

#[test]
fn test_empty_batch() {
    let test = TestTablet::new();
    let list = test.execute_batch(&[], TransactionId::NONE).unwrap();
    assert!(list.list.is_empty());
}
