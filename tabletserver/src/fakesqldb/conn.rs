use std::sync::Arc;

use crate::fakesqldb::FakeDb;
use crate::sqldb::{Charset, DbConnection, SqlError};
use crate::types::{ConnectionId, Field, QueryResult, Row};

/// A connection to a [`FakeDb`].
///
/// Holds at most one streaming cursor at a time. Once closed, every fetch
/// fails with `SqlError::ConnectionClosed`.
pub struct FakeConn {
    db: Arc<FakeDb>,
    closed: bool,
    id: ConnectionId,
    cursor: Option<Cursor>,
    charset: Charset,
}

/// Streaming position into a result's rows.
///
/// The cursor keeps the result it was opened on, so re-registering the
/// query mid-stream does not change what the stream returns.
struct Cursor {
    result: Arc<QueryResult>,
    next_row: usize,
}

impl FakeConn {
    pub(crate) fn new(db: Arc<FakeDb>) -> Self {
        let id = db.next_connection_id();
        Self {
            db,
            closed: false,
            id,
            cursor: None,
            charset: Charset::default(),
        }
    }

    const fn check_open(&self) -> Result<(), SqlError> {
        if self.closed {
            return Err(SqlError::ConnectionClosed);
        }
        Ok(())
    }
}

impl DbConnection for FakeConn {
    fn execute_fetch(
        &mut self,
        query: &str,
        max_rows: usize,
        want_fields: bool,
    ) -> Result<QueryResult, SqlError> {
        self.check_open()?;

        let Some(result) = self.db.get_query(query) else {
            tracing::warn!("unexpected query: {query}, will return an empty result");
            return Ok(QueryResult::empty());
        };

        if result.rows_affected > u64::try_from(max_rows).unwrap_or(u64::MAX) {
            return Err(SqlError::RowLimitExceeded {
                max_rows,
                rows_affected: result.rows_affected,
            });
        }

        let rows = usize::try_from(result.rows_affected)
            .ok()
            .and_then(|count| result.rows.get(..count))
            .ok_or_else(|| SqlError::ShortResult {
                query: query.to_string(),
                rows_affected: result.rows_affected,
                available: result.rows.len(),
            })?;

        Ok(QueryResult {
            fields: if want_fields {
                result.fields.clone()
            } else {
                Vec::new()
            },
            rows_affected: result.rows_affected,
            insert_id: result.insert_id,
            rows: rows.to_vec(),
        })
    }

    fn execute_stream_fetch(&mut self, query: &str) -> Result<u64, SqlError> {
        self.check_open()?;
        self.cursor = None;
        let result = self.db.get_query_or_empty(query);
        if !usize::try_from(result.rows_affected).is_ok_and(|n| n <= result.rows.len()) {
            return Err(SqlError::ShortResult {
                query: query.to_string(),
                rows_affected: result.rows_affected,
                available: result.rows.len(),
            });
        }
        let rows_affected = result.rows_affected;
        self.cursor = Some(Cursor {
            result,
            next_row: 0,
        });
        Ok(rows_affected)
    }

    fn fetch_next(&mut self) -> Result<Option<Row>, SqlError> {
        self.check_open()?;
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        let Some(row) = cursor.result.rows.get(cursor.next_row) else {
            return Ok(None);
        };
        cursor.next_row += 1;
        Ok(Some(row.clone()))
    }

    fn close_result(&mut self) {
        self.cursor = None;
    }

    fn fields(&self) -> Vec<Field> {
        self.cursor
            .as_ref()
            .map(|cursor| cursor.result.fields.clone())
            .unwrap_or_default()
    }

    fn close(&mut self) {
        self.closed = true;
        self.cursor = None;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn shutdown(&mut self) {}

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn read_packet(&mut self) -> Result<Vec<u8>, SqlError> {
        Ok(Vec::new())
    }

    fn send_command(&mut self, _command: u32, _data: &[u8]) -> Result<(), SqlError> {
        Ok(())
    }

    fn charset(&self) -> Result<Charset, SqlError> {
        Ok(self.charset)
    }

    fn set_charset(&mut self, charset: Charset) -> Result<(), SqlError> {
        self.charset = charset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::sqldb::SequentialIdSource;
    use crate::types::Value;

    fn int_rows(values: &[i64]) -> Vec<Row> {
        values.iter().map(|v| vec![Value::Int(*v)]).collect()
    }

    fn setup() -> (Arc<FakeDb>, FakeConn) {
        let db = FakeDb::with_id_source(Arc::new(SequentialIdSource::default()));
        let conn = db.connect().unwrap();
        (db, conn)
    }

    #[test]
    fn test_execute_fetch_without_fields() {
        let (db, mut conn) = setup();
        db.add_query(
            "SELECT 1",
            &QueryResult::from_rows(vec![Field::new("1", 8)], int_rows(&[1, 2])),
        );

        let result = conn.execute_fetch("SELECT 1", 10, false).unwrap();
        assert_eq!(result.rows_affected, 2);
        assert_eq!(result.rows, int_rows(&[1, 2]));
        assert!(result.fields.is_empty());
    }

    #[test]
    fn test_execute_fetch_returns_registration() {
        let (db, mut conn) = setup();
        let registered = QueryResult {
            fields: vec![Field::new("field1", 42), Field::new("field2", 73)],
            rows_affected: 2,
            insert_id: 72,
            rows: vec![
                vec![Value::string("row1 value1"), Value::string("row1 value2")],
                vec![Value::string("row2 value1"), Value::string("row2 value2")],
            ],
        };
        db.add_query("select * from t", &registered);

        let result = conn.execute_fetch("select * from t", 2, true).unwrap();
        assert_eq!(result, registered);
    }

    #[test]
    fn test_execute_fetch_copies_only_rows_affected() {
        let (db, mut conn) = setup();
        let mut registered = QueryResult::from_rows(vec![], int_rows(&[1, 2, 3]));
        registered.rows_affected = 2;
        db.add_query("q", &registered);

        let result = conn.execute_fetch("q", 10, true).unwrap();
        assert_eq!(result.rows, int_rows(&[1, 2]));
    }

    #[test]
    fn test_execute_fetch_short_result() {
        let (db, mut conn) = setup();
        let mut registered = QueryResult::from_rows(vec![], int_rows(&[1, 2]));
        registered.rows_affected = 123;
        db.add_query("q", &registered);

        let err = conn.execute_fetch("q", 1000, true).unwrap_err();
        assert_eq!(
            err,
            SqlError::ShortResult {
                query: "q".to_string(),
                rows_affected: 123,
                available: 2,
            }
        );
    }

    #[test]
    fn test_execute_fetch_unknown_query_is_empty() {
        let (_db, mut conn) = setup();
        let result = conn.execute_fetch("never registered", 0, true).unwrap();
        assert_eq!(result, QueryResult::empty());
    }

    #[test]
    fn test_execute_fetch_row_limit() {
        let (db, mut conn) = setup();
        db.add_query("q", &QueryResult::from_rows(vec![], int_rows(&[1, 2, 3])));

        assert_eq!(
            conn.execute_fetch("q", 2, false).unwrap_err(),
            SqlError::RowLimitExceeded {
                max_rows: 2,
                rows_affected: 3,
            }
        );
        assert!(conn.execute_fetch("q", 3, false).is_ok());
    }

    #[test]
    fn test_fetches_on_closed_connection_fail() {
        let (db, mut conn) = setup();
        db.add_query("q", &QueryResult::from_rows(vec![], int_rows(&[1])));
        conn.close();
        assert!(conn.is_closed());

        assert_eq!(
            conn.execute_fetch("q", 10, true).unwrap_err(),
            SqlError::ConnectionClosed
        );
        assert_eq!(
            conn.execute_fetch_map("q").unwrap_err(),
            SqlError::ConnectionClosed
        );
        assert_eq!(
            conn.execute_stream_fetch("q").unwrap_err(),
            SqlError::ConnectionClosed
        );
        assert_eq!(conn.fetch_next().unwrap_err(), SqlError::ConnectionClosed);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (_db, mut conn) = setup();
        conn.close();
        conn.close();
        assert!(conn.is_closed());
    }

    #[test]
    fn test_execute_fetch_map() {
        let (db, mut conn) = setup();
        db.add_query(
            "select name, age from users where id = 1",
            &QueryResult::from_rows(
                vec![Field::new("name", 253), Field::new("age", 3)],
                vec![vec![Value::string("ada"), Value::Int(36)]],
            ),
        );

        let map = conn
            .execute_fetch_map("select name, age from users where id = 1")
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["name"], "ada");
        assert_eq!(map["age"], "36");
    }

    #[test]
    fn test_execute_fetch_map_two_rows() {
        let (db, mut conn) = setup();
        let mut registered = QueryResult::from_rows(vec![Field::new("id", 8)], int_rows(&[1, 2]));
        db.add_query("q", &registered);

        assert_eq!(
            conn.execute_fetch_map("q").unwrap_err(),
            SqlError::RowCountMismatch {
                query: "q".to_string(),
                rows: 2,
            }
        );

        // A result that affects no rows comes back with none.
        registered.rows_affected = 0;
        db.add_query("q", &registered);
        assert_eq!(
            conn.execute_fetch_map("q").unwrap_err(),
            SqlError::RowCountMismatch {
                query: "q".to_string(),
                rows: 0,
            }
        );
    }

    #[test]
    fn test_execute_fetch_map_field_count_mismatch() {
        let (db, mut conn) = setup();
        db.add_query(
            "q",
            &QueryResult::from_rows(
                vec![Field::new("only", 8)],
                vec![vec![Value::Int(1), Value::Int(2)]],
            ),
        );

        assert_eq!(
            conn.execute_fetch_map("q").unwrap_err(),
            SqlError::FieldCountMismatch {
                query: "q".to_string(),
                fields: 1,
                columns: 2,
            }
        );
    }

    #[test]
    fn test_stream_fetch_yields_rows_then_end() {
        let (db, mut conn) = setup();
        db.add_query("q", &QueryResult::from_rows(vec![], int_rows(&[10, 20, 30])));

        conn.execute_stream_fetch("q").unwrap();
        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(10)]));
        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(20)]));
        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(30)]));
        assert_eq!(conn.fetch_next().unwrap(), None);
        assert_eq!(conn.fetch_next().unwrap(), None);
    }

    #[test]
    fn test_stream_fetch_describes_without_reading() {
        let (db, mut conn) = setup();
        assert!(conn.fields().is_empty());
        db.add_query(
            "q",
            &QueryResult::from_rows(vec![Field::new("a", 1)], int_rows(&[1, 2])),
        );

        assert_eq!(conn.execute_stream_fetch("q").unwrap(), 2);
        assert_eq!(conn.fields(), vec![Field::new("a", 1)]);
        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(1)]));

        conn.close_result();
        assert!(conn.fields().is_empty());
        assert_eq!(conn.fetch_next().unwrap(), None);
    }

    #[test]
    fn test_stream_fetch_short_result() {
        let (db, mut conn) = setup();
        let mut registered = QueryResult::from_rows(vec![], int_rows(&[1]));
        registered.rows_affected = 4;
        db.add_query("q", &registered);

        assert_eq!(
            conn.execute_stream_fetch("q").unwrap_err(),
            SqlError::ShortResult {
                query: "q".to_string(),
                rows_affected: 4,
                available: 1,
            }
        );
        assert_eq!(conn.fetch_next().unwrap(), None);
    }

    #[test]
    fn test_fetch_next_without_cursor_is_end_of_stream() {
        let (_db, mut conn) = setup();
        assert_eq!(conn.fetch_next().unwrap(), None);
    }

    #[test]
    fn test_stream_fetch_unknown_query_is_empty_stream() {
        let (_db, mut conn) = setup();
        conn.execute_stream_fetch("unknown").unwrap();
        assert_eq!(conn.fetch_next().unwrap(), None);
    }

    #[test]
    fn test_stream_fetch_restarts_cursor() {
        let (db, mut conn) = setup();
        db.add_query("a", &QueryResult::from_rows(vec![], int_rows(&[1, 2])));
        db.add_query("b", &QueryResult::from_rows(vec![], int_rows(&[9])));

        conn.execute_stream_fetch("a").unwrap();
        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(1)]));

        conn.execute_stream_fetch("b").unwrap();
        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(9)]));
        assert_eq!(conn.fetch_next().unwrap(), None);
    }

    #[test]
    fn test_stream_keeps_snapshot_after_overwrite() {
        let (db, mut conn) = setup();
        db.add_query("q", &QueryResult::from_rows(vec![], int_rows(&[1, 2])));
        conn.execute_stream_fetch("q").unwrap();

        db.add_query("q", &QueryResult::empty());
        db.delete_query("q");

        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(1)]));
        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(2)]));
        assert_eq!(conn.fetch_next().unwrap(), None);
    }

    #[test]
    fn test_charset_default_and_set() {
        let (_db, mut conn) = setup();
        assert_eq!(conn.charset().unwrap(), Charset::default());

        let latin1 = Charset {
            client: 8,
            conn: 8,
            server: 8,
        };
        conn.set_charset(latin1).unwrap();
        assert_eq!(conn.charset().unwrap(), latin1);
    }

    #[test]
    fn test_driver_stubs_have_no_effect() {
        let (db, mut conn) = setup();
        db.add_query("q", &QueryResult::from_rows(vec![Field::new("a", 1)], int_rows(&[1])));
        conn.execute_stream_fetch("q").unwrap();

        assert!(conn.read_packet().unwrap().is_empty());
        conn.send_command(3, b"select 1").unwrap();
        conn.shutdown();

        assert!(!conn.is_closed());
        assert_eq!(conn.fetch_next().unwrap(), Some(vec![Value::Int(1)]));
    }

    #[test]
    fn test_ids_are_stable_and_unique() {
        let (db, conn) = setup();
        assert_eq!(conn.id(), conn.id());

        let ids: HashSet<ConnectionId> = (0..50).map(|_| db.connect().unwrap().id()).collect();
        assert_eq!(ids.len(), 50);
        assert!(!ids.contains(&conn.id()));
    }

    #[test]
    fn test_concurrent_connections_see_same_store() {
        let db = FakeDb::new();
        db.add_query("q", &QueryResult::from_rows(vec![], int_rows(&[1, 2, 3])));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    let mut conn = db.connect().unwrap();
                    conn.execute_stream_fetch("q").unwrap();
                    let mut rows = Vec::new();
                    while let Some(row) = conn.fetch_next().unwrap() {
                        rows.push(row);
                    }
                    (conn.id(), rows)
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            let (id, rows) = handle.join().unwrap();
            assert_eq!(rows, int_rows(&[1, 2, 3]));
            ids.insert(id);
        }
        assert_eq!(ids.len(), 4);
    }
}
