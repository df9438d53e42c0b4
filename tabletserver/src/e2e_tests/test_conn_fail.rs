//! Injected connection failures.

use crate::e2e_tests::helpers::*;
use crate::queryservice::QueryServiceError;
use crate::sqldb::{CONNECT_FAIL_ERRNO, SqlError};
use crate::types::{BoundQuery, TransactionId};

const CONNECT_FAIL: QueryServiceError = QueryServiceError::Sql(SqlError::ConnectFail);

#[test]
fn test_conn_fail_blocks_new_connections() {
    let test = TestTablet::new();
    test.db.add_query("select id from t", &int_rows(1));
    test.db.enable_conn_fail();

    assert_eq!(test.begin(), Err(CONNECT_FAIL));
    assert_eq!(test.execute("select id from t", TransactionId::NONE), Err(CONNECT_FAIL));
    assert_eq!(test.stream("select id from t", TransactionId::NONE), Err(CONNECT_FAIL));
    assert_eq!(
        test.split(BoundQuery::new("select id from t"), 2),
        Err(CONNECT_FAIL)
    );
    assert_eq!(SqlError::ConnectFail.errno(), Some(CONNECT_FAIL_ERRNO));

    test.db.disable_conn_fail();
    assert!(test.execute("select id from t", TransactionId::NONE).is_ok());
}

#[test]
fn test_open_transaction_survives_conn_fail() {
    let test = TestTablet::new();
    test.db.add_query("select id from t", &int_rows(1));
    let tx = test.begin().unwrap();

    // Only connection creation is affected.
    test.db.enable_conn_fail();
    assert_eq!(test.execute("select id from t", tx).unwrap(), int_rows(1));
    test.commit(tx).unwrap();
    assert_eq!(test.server.open_transactions().unwrap(), 0);
}

#[test]
fn test_stream_in_open_transaction_survives_conn_fail() {
    let test = TestTablet::new();
    test.db.add_query("select id from t", &int_rows(3));
    let tx = test.begin().unwrap();

    test.db.enable_conn_fail();
    let fragments = completed_fragments(test.stream("select id from t", tx).unwrap());
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[1].rows, int_rows(3).rows);

    // The transaction keeps its connection after the stream.
    assert_eq!(test.execute("select id from t", tx).unwrap(), int_rows(3));
    test.commit(tx).unwrap();
    assert_eq!(test.server.open_transactions().unwrap(), 0);
    assert_eq!(test.stream("select id from t", TransactionId::NONE), Err(CONNECT_FAIL));
}
