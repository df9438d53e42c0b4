//! Query splitting over the registered row estimate.

use crate::e2e_tests::helpers::*;
use crate::queryservice::QueryServiceError;
use crate::queryservice::split::{KEYSPACE_ID_END, KEYSPACE_ID_START};
use crate::types::{BoundQuery, Value};

fn split_query() -> BoundQuery {
    BoundQuery::new("splitQuery").bind("bind1", 43_i64)
}

#[test]
fn test_split_into_at_most_split_count() {
    let test = TestTablet::new();
    test.db.add_query("splitQuery", &int_rows(4456));

    let splits = test.split(split_query(), 372).unwrap();
    assert_eq!(splits.len(), 372);
    assert_eq!(splits.iter().map(|s| s.row_count).sum::<u64>(), 4456);

    let original = split_query();
    for split in &splits {
        assert_eq!(split.query.sql, original.sql);
        assert!(split.query.bind_variables.len() > original.bind_variables.len());
        assert_eq!(split.query.bind_variables.get("bind1"), Some(&Value::Int(43)));
    }
    assert_eq!(
        splits[0].query.bind_variables.get(KEYSPACE_ID_START),
        Some(&Value::Uint(0))
    );
    assert_eq!(
        splits[371].query.bind_variables.get(KEYSPACE_ID_END),
        Some(&Value::Null)
    );
}

#[test]
fn test_small_table_gets_fewer_splits() {
    let test = TestTablet::new();
    test.db.add_query("splitQuery", &int_rows(5));
    let splits = test.split(split_query(), 372).unwrap();
    assert_eq!(splits.len(), 5);
    assert!(splits.iter().all(|s| s.row_count == 1));
}

#[test]
fn test_unknown_query_gets_one_split() {
    let test = TestTablet::new();
    let splits = test.split(split_query(), 372).unwrap();
    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].row_count, 0);
}

#[test]
fn test_invalid_split_requests() {
    let test = TestTablet::new();
    assert!(matches!(
        test.split(split_query(), 0),
        Err(QueryServiceError::InvalidArgument(_))
    ));
    assert!(matches!(
        test.split(split_query().bind(KEYSPACE_ID_END, 7_u64), 4),
        Err(QueryServiceError::InvalidArgument(_))
    ));
}
