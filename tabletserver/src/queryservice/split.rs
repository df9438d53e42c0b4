//! Splitting a query into keyspace-id range partitions.
//!
//! The unsigned 64-bit keyspace-id space is cut into equal ranges, one per
//! split. Each split keeps the original statement and bind variables and
//! adds the range boundaries as two extra bind variables.

use crate::queryservice::QueryServiceError;
use crate::types::{BoundQuery, QuerySplit, Value};

/// Bind variable holding a split's inclusive lower keyspace-id boundary.
pub const KEYSPACE_ID_START: &str = "keyspace_id_start";
/// Bind variable holding a split's exclusive upper keyspace-id boundary.
/// `NULL` on the last split, which is unbounded.
pub const KEYSPACE_ID_END: &str = "keyspace_id_end";

/// Partition `query` into at most `split_count` splits over an estimated
/// `estimated_rows` rows.
///
/// There are `min(split_count, max(estimated_rows, 1))` splits. Row estimates
/// are spread evenly, the first splits taking the remainder.
///
/// # Errors
///
/// Returns `QueryServiceError::InvalidArgument` if `split_count` is zero or
/// the query already binds one of the boundary names.
pub fn split_query(
    query: &BoundQuery,
    split_count: u32,
    estimated_rows: u64,
) -> Result<Vec<QuerySplit>, QueryServiceError> {
    if split_count == 0 {
        return Err(QueryServiceError::InvalidArgument(
            "split count must be positive".to_string(),
        ));
    }
    for reserved in [KEYSPACE_ID_START, KEYSPACE_ID_END] {
        if query.bind_variables.contains_key(reserved) {
            return Err(QueryServiceError::InvalidArgument(format!(
                "bind variable {reserved} is reserved for split boundaries"
            )));
        }
    }

    let splits = u64::from(split_count).min(estimated_rows.max(1));
    let base_rows = estimated_rows / splits;
    let extra_rows = estimated_rows % splits;

    Ok((0..splits)
        .map(|i| {
            let end = if i + 1 == splits {
                Value::Null
            } else {
                Value::Uint(boundary(i + 1, splits))
            };
            let bound = query
                .clone()
                .bind(KEYSPACE_ID_START, boundary(i, splits))
                .bind(KEYSPACE_ID_END, end);
            QuerySplit {
                query: bound,
                row_count: base_rows + u64::from(i < extra_rows),
            }
        })
        .collect())
}

/// The `index`-th of `splits` equally spaced points in `[0, 2^64)`.
fn boundary(index: u64, splits: u64) -> u64 {
    let point = (u128::from(index) << 64) / u128::from(splits);
    u64::try_from(point).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> BoundQuery {
        BoundQuery::new("splitQuery").bind("bind1", 43_i64)
    }

    fn start(split: &QuerySplit) -> &Value {
        &split.query.bind_variables[KEYSPACE_ID_START]
    }

    fn end(split: &QuerySplit) -> &Value {
        &split.query.bind_variables[KEYSPACE_ID_END]
    }

    #[test]
    fn test_split_count_is_an_upper_bound() {
        let splits = split_query(&query(), 372, 4456).unwrap();
        assert_eq!(splits.len(), 372);

        let splits = split_query(&query(), 372, 10).unwrap();
        assert_eq!(splits.len(), 10);
    }

    #[test]
    fn test_splits_extend_bind_variables() {
        let original = query();
        for split in split_query(&original, 372, 4456).unwrap() {
            assert_eq!(split.query.sql, original.sql);
            assert!(split.query.bind_variables.len() > original.bind_variables.len());
            for (name, value) in &original.bind_variables {
                assert_eq!(split.query.bind_variables.get(name), Some(value));
            }
        }
    }

    #[test]
    fn test_row_estimates_sum_to_total() {
        let splits = split_query(&query(), 372, 4456).unwrap();
        let total: u64 = splits.iter().map(|s| s.row_count).sum();
        assert_eq!(total, 4456);
        // 4456 = 372 * 11 + 364
        assert_eq!(splits[0].row_count, 12);
        assert_eq!(splits[363].row_count, 12);
        assert_eq!(splits[364].row_count, 11);
    }

    #[test]
    fn test_boundaries_are_contiguous() {
        let splits = split_query(&query(), 4, 100).unwrap();
        assert_eq!(start(&splits[0]), &Value::Uint(0));
        assert_eq!(start(&splits[1]), &Value::Uint(1 << 62));
        assert_eq!(start(&splits[2]), &Value::Uint(1 << 63));
        for pair in splits.windows(2) {
            assert_eq!(end(&pair[0]), start(&pair[1]));
        }
        assert_eq!(end(&splits[3]), &Value::Null);
    }

    #[test]
    fn test_no_rows_gives_single_unbounded_split() {
        let splits = split_query(&query(), 8, 0).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].row_count, 0);
        assert_eq!(start(&splits[0]), &Value::Uint(0));
        assert_eq!(end(&splits[0]), &Value::Null);
    }

    #[test]
    fn test_zero_split_count_is_rejected() {
        assert!(matches!(
            split_query(&query(), 0, 10),
            Err(QueryServiceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_reserved_bind_variable_is_rejected() {
        let query = query().bind(KEYSPACE_ID_START, 1_u64);
        assert!(matches!(
            split_query(&query, 2, 10),
            Err(QueryServiceError::InvalidArgument(_))
        ));
    }
}
