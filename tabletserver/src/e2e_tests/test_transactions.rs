//! Transaction lifecycle through `TabletServer`.

use crate::e2e_tests::helpers::*;
use crate::types::TransactionId;

#[test]
fn test_begin_commit_then_begin_again() {
    let test = TestTablet::new();
    test.db.add_query("select id from t", &int_rows(2));

    let tx = test.begin().unwrap();
    assert!(!tx.is_none());
    assert_eq!(test.execute("select id from t", tx).unwrap(), int_rows(2));
    test.commit(tx).unwrap();

    let next = test.begin().unwrap();
    assert_ne!(next, tx);
    test.rollback(next).unwrap();
    assert_eq!(test.server.open_transactions().unwrap(), 0);
}

#[test]
fn test_consumed_transaction_is_dead() {
    let test = TestTablet::new();
    let tx = test.begin().unwrap();
    test.rollback(tx).unwrap();

    assert!(is_violation(&test.commit(tx)));
    assert!(is_violation(&test.rollback(tx)));
    assert!(is_violation(&test.execute("select 1", tx)));
    assert!(is_violation(&test.stream("select 1", tx)));
    assert!(is_violation(&test.execute_batch(&["select 1"], tx)));
}

#[test]
fn test_never_issued_transaction() {
    let test = TestTablet::new();
    assert!(is_violation(&test.commit(TransactionId(999_044))));
    assert!(is_violation(&test.execute("select 1", TransactionId(678))));
}

#[test]
fn test_one_active_transaction_per_session() {
    let test = TestTablet::new();
    let tx = test.begin().unwrap();
    assert!(is_violation(&test.begin()));
    assert_eq!(test.server.open_transactions().unwrap(), 1);
    test.commit(tx).unwrap();
}

#[test]
fn test_issued_ids_are_unique() {
    let test = TestTablet::new();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..50 {
        let tx = test.begin().unwrap();
        assert!(seen.insert(tx));
        test.commit(tx).unwrap();
    }
}
