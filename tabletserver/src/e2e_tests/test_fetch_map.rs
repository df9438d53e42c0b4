//! Single-row map fetches through a registered driver.

use std::collections::HashMap;
use std::sync::Arc;

use crate::fakesqldb::FakeDb;
use crate::sqldb::{DbConnection, DriverRegistry, SqlError};
use crate::types::{Field, QueryResult, Value};

fn connect(db: &Arc<FakeDb>) -> Box<dyn DbConnection> {
    let drivers = DriverRegistry::new();
    let name = db.register(&drivers);
    drivers.connect(&name).unwrap()
}

#[test]
fn test_fetch_map_single_row() {
    let db = FakeDb::new();
    db.add_query(
        "show status",
        &QueryResult::from_rows(
            vec![Field::new("name", 253), Field::new("value", 8)],
            vec![vec![Value::string("uptime"), Value::Int(42)]],
        ),
    );

    let mut conn = connect(&db);
    let map = conn.execute_fetch_map("show status").unwrap();
    assert_eq!(
        map,
        HashMap::from([
            ("name".to_string(), "uptime".to_string()),
            ("value".to_string(), "42".to_string()),
        ])
    );
}

#[test]
fn test_fetch_map_two_rows() {
    let db = FakeDb::new();
    db.add_query(
        "select v",
        &QueryResult::from_rows(
            vec![Field::new("v", 8)],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        ),
    );

    let mut conn = connect(&db);
    assert_eq!(
        conn.execute_fetch_map("select v"),
        Err(SqlError::RowCountMismatch {
            query: "select v".to_string(),
            rows: 2,
        })
    );
}

#[test]
fn test_fetch_map_unknown_query() {
    let db = FakeDb::new();
    let mut conn = connect(&db);
    assert!(matches!(
        conn.execute_fetch_map("select nothing"),
        Err(SqlError::RowCountMismatch { rows: 0, .. })
    ));
}

#[test]
fn test_fetch_map_on_closed_connection() {
    let db = FakeDb::new();
    let mut conn = connect(&db);
    conn.close();
    assert!(conn.is_closed());
    assert_eq!(
        conn.execute_fetch_map("select v"),
        Err(SqlError::ConnectionClosed)
    );
}
