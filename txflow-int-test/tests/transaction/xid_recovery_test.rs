use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use txflow::transaction::XidFactory;
use txflow::{LocalTransactionManager, TransactionManagerProvider};
use txflow_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_transactions_get_distinct_xids() {
    run_test(
        create_test_context,
        |ctx| {
            let mut seen = HashSet::new();
            for _ in 0..50 {
                let tx = ctx.begin_ambient()?;
                assert!(seen.insert(tx.id().clone()));
                assert!(tx.id().branch_qualifier().is_empty());
                tx.commit()?;
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_restarted_manager_recognises_previous_xids() {
    let before = LocalTransactionManager::builder().tm_id("inventory").build().unwrap();
    let ctx = txflow::ContextId::detached();
    before.begin(ctx).unwrap();
    let old = before.transaction(ctx).unwrap().unwrap();
    let old_xid = old.id().clone();
    old.rollback().unwrap();

    thread::sleep(Duration::from_millis(5));
    let after = LocalTransactionManager::builder().tm_id("inventory").build().unwrap();
    let factory = after.xid_factory();

    let recovered = factory.recover(
        old_xid.format_id(),
        old_xid.global_id(),
        old_xid.branch_qualifier(),
    );
    assert_eq!(recovered, old_xid);
    assert!(factory.matches_global_id(recovered.global_id()));

    let branch = before.xid_factory().create_branch(&old_xid, 3);
    assert!(factory.matches_branch_id(branch.branch_qualifier()));
}

#[test]
fn test_foreign_xids_are_not_recognised() {
    let ours = XidFactory::new(b"billing");
    thread::sleep(Duration::from_millis(5));
    let theirs = XidFactory::new(b"shipping");
    let xid = ours.create_xid();

    assert!(!theirs.matches_global_id(xid.global_id()));
    assert!(!theirs.matches_global_id(&xid.global_id()[..16]));

    let branch = ours.create_branch(&xid, 1);
    assert!(!theirs.matches_branch_id(branch.branch_qualifier()));
}

#[test]
fn test_current_factory_does_not_claim_its_own_xids() {
    let factory = XidFactory::new(b"ledger");
    let xid = factory.create_xid();
    assert!(!factory.matches_global_id(xid.global_id()));
}
