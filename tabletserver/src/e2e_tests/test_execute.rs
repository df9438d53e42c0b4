//! Single-query execution against registered results.

use crate::config::TabletConfig;
use crate::e2e_tests::helpers::*;
use crate::queryservice::QueryServiceError;
use crate::sqldb::SqlError;
use crate::types::{Field, QueryResult, TransactionId, Value};

#[test]
fn test_execute_returns_registration() {
    let test = TestTablet::new();
    let result = QueryResult {
        fields: vec![Field::new("name", 253), Field::new("n", 8)],
        rows_affected: 2,
        insert_id: 17,
        rows: vec![
            vec![Value::string("a"), Value::Int(1)],
            vec![Value::Null, Value::Uint(2)],
        ],
    };
    test.db.add_query("select name, n from t", &result);

    let got = test
        .execute("select name, n from t", TransactionId::NONE)
        .unwrap();
    assert_eq!(got, result);
}

#[test]
fn test_unknown_query_is_empty() {
    let test = TestTablet::new();
    let got = test.execute("select * from nowhere", TransactionId::NONE).unwrap();
    assert_eq!(got, QueryResult::empty());
}

#[test]
fn test_overwrite_and_delete() {
    let test = TestTablet::new();
    test.db.add_query("q", &int_rows(1));
    test.db.add_query("q", &int_rows(3));
    assert_eq!(test.execute("q", TransactionId::NONE).unwrap().rows.len(), 3);

    test.db.delete_query("q");
    assert_eq!(
        test.execute("q", TransactionId::NONE).unwrap(),
        QueryResult::empty()
    );
}

#[test]
fn test_row_limit_from_config() {
    let test = TestTablet::with_config(&TabletConfig {
        max_result_rows: 10,
        ..TabletConfig::default()
    });
    test.db.add_query("small", &int_rows(10));
    test.db.add_query("large", &int_rows(11));

    assert!(test.execute("small", TransactionId::NONE).is_ok());
    assert_eq!(
        test.execute("large", TransactionId::NONE),
        Err(QueryServiceError::Sql(SqlError::RowLimitExceeded {
            max_rows: 10,
            rows_affected: 11,
        }))
    );
}

#[test]
fn test_short_result_is_an_error() {
    let test = TestTablet::new();
    let mut result = int_rows(1);
    result.rows_affected = 5;
    test.db.add_query("short", &result);

    assert!(matches!(
        test.execute("short", TransactionId::NONE),
        Err(QueryServiceError::Sql(SqlError::ShortResult {
            rows_affected: 5,
            available: 1,
            ..
        }))
    ));
}
