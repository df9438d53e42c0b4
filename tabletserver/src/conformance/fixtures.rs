//! Requests and replies exchanged by the conformance suite.

use crate::types::{
    BindVariables, BoundQuery, Field, QueryResult, QueryResultList, QuerySplit, SessionId,
    TransactionId, Value,
};

pub const KEYSPACE: &str = "test_keyspace";
pub const SHARD: &str = "test_shard";
pub const SESSION_ID: SessionId = SessionId(5678);

pub const BEGIN_TRANSACTION_ID: TransactionId = TransactionId(9990);
pub const COMMIT_TRANSACTION_ID: TransactionId = TransactionId(999_044);
pub const ROLLBACK_TRANSACTION_ID: TransactionId = TransactionId(999_044);

pub const EXECUTE_QUERY: &str = "executeQuery";
pub const EXECUTE_TRANSACTION_ID: TransactionId = TransactionId(678);

pub const STREAM_EXECUTE_QUERY: &str = "streamExecuteQuery";
pub const STREAM_EXECUTE_TRANSACTION_ID: TransactionId = TransactionId(6_789_992);

pub const EXECUTE_BATCH_TRANSACTION_ID: TransactionId = TransactionId(678);

pub const SPLIT_QUERY_SPLIT_COUNT: u32 = 372;

fn bind_vars(name: &str, value: i64) -> BindVariables {
    BindVariables::from([(name.to_string(), Value::Int(value))])
}

fn two_string_rows() -> Vec<Vec<Value>> {
    vec![
        vec![Value::string("row1 value1"), Value::string("row1 value2")],
        vec![Value::string("row2 value1"), Value::string("row2 value2")],
    ]
}

fn two_fields() -> Vec<Field> {
    vec![Field::new("field1", 42), Field::new("field2", 73)]
}

#[must_use]
pub fn execute_bind_vars() -> BindVariables {
    bind_vars("bind1", 1_114_444)
}

#[must_use]
pub fn execute_query_result() -> QueryResult {
    QueryResult {
        fields: two_fields(),
        rows_affected: 123,
        insert_id: 72,
        rows: two_string_rows(),
    }
}

#[must_use]
pub fn stream_execute_bind_vars() -> BindVariables {
    bind_vars("bind1", 93_848_000)
}

/// First streamed fragment: fields only.
#[must_use]
pub fn stream_execute_header() -> QueryResult {
    QueryResult {
        fields: two_fields(),
        ..QueryResult::default()
    }
}

/// Second streamed fragment: rows only.
#[must_use]
pub fn stream_execute_rows() -> QueryResult {
    QueryResult::rows_fragment(two_string_rows())
}

#[must_use]
pub fn execute_batch_queries() -> Vec<BoundQuery> {
    vec![
        BoundQuery::new("executeBatchQueries1").bind("bind1", 43_i64),
        BoundQuery::new("executeBatchQueries2").bind("bind2", 72_i64),
    ]
}

#[must_use]
pub fn execute_batch_result_list() -> QueryResultList {
    QueryResultList {
        list: vec![
            QueryResult {
                fields: vec![Field::new("field1", 46)],
                rows_affected: 1232,
                insert_id: 712,
                rows: vec![
                    vec![Value::string("row1 value1")],
                    vec![Value::string("row2 value1")],
                ],
            },
            QueryResult {
                fields: vec![Field::new("field1", 42)],
                rows_affected: 12333,
                insert_id: 74442,
                rows: vec![vec![
                    Value::string("row1 value1"),
                    Value::string("row1 value2"),
                ]],
            },
        ],
    }
}

#[must_use]
pub fn split_query_bound_query() -> BoundQuery {
    BoundQuery::new("splitQuery").bind("bind1", 43_i64)
}

#[must_use]
pub fn split_query_splits() -> Vec<QuerySplit> {
    vec![QuerySplit {
        query: split_query_bound_query().bind("keyspace_id", 3333_i64),
        row_count: 4456,
    }]
}
