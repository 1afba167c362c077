use std::time::Duration;
use txflow::errors::ErrorKind;
use txflow::{ContextId, LocalTransactionManager, TransactionManagerProvider, TransactionStatus};
use txflow_int_test::test_util::{cleanup, create_test_context, run_test, StatusRecorder};

#[test]
fn test_builder_rejects_invalid_settings() {
    let err = LocalTransactionManager::builder()
        .default_timeout(0)
        .build()
        .err()
        .map(|e| e.kind().clone());
    assert_eq!(err, Some(ErrorKind::InvalidConfiguration));

    let err = LocalTransactionManager::builder()
        .tm_id("   ")
        .build()
        .err()
        .map(|e| e.kind().clone());
    assert_eq!(err, Some(ErrorKind::InvalidConfiguration));
}

#[test]
fn test_config_is_frozen_after_build() {
    let tm = LocalTransactionManager::builder()
        .tm_id("orders")
        .default_timeout(30)
        .build()
        .unwrap();

    assert_eq!(tm.config().tm_id(), "orders");
    assert_eq!(tm.config().default_timeout(), 30);
    assert!(tm.config().set_default_timeout(45).is_err());
    assert_eq!(tm.config().default_timeout(), 30);
}

#[test]
fn test_long_tm_id_is_truncated() {
    let long_id = "x".repeat(100);
    let tm = LocalTransactionManager::builder().tm_id(&long_id).build().unwrap();
    assert_eq!(tm.config().tm_id().chars().count(), 64);
}

#[test]
fn test_begin_commit_lifecycle() {
    run_test(
        create_test_context,
        |ctx| {
            let tm = ctx.tm();
            assert_eq!(tm.status(ctx.ctx())?, TransactionStatus::NoTransaction);

            tm.begin(ctx.ctx())?;
            let recorder = StatusRecorder::new();
            recorder.attach(&ctx.require_active()?)?;
            assert_eq!(tm.status(ctx.ctx())?, TransactionStatus::Active);
            assert_eq!(tm.associated_contexts(), 1);

            let nested = tm.begin(ctx.ctx()).unwrap_err();
            assert_eq!(nested.kind(), &ErrorKind::NotSupported);

            tm.commit(ctx.ctx())?;
            assert_eq!(tm.status(ctx.ctx())?, TransactionStatus::NoTransaction);
            assert_eq!(tm.associated_contexts(), 0);
            assert_eq!(recorder.statuses(), vec![TransactionStatus::Committed]);

            let err = tm.commit(ctx.ctx()).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IllegalState);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_rollback_only_commit_rolls_back() {
    run_test(
        create_test_context,
        |ctx| {
            let tm = ctx.tm();
            let tx = ctx.begin_ambient()?;
            tm.set_rollback_only(ctx.ctx())?;
            assert_eq!(tx.status(), TransactionStatus::MarkedRollback);

            let err = tm.commit(ctx.ctx()).unwrap_err();
            assert!(err.is_rolled_back());
            assert_eq!(tx.status(), TransactionStatus::RolledBack);

            let late = tx.register(|_status: TransactionStatus| {}).unwrap_err();
            assert_eq!(late.kind(), &ErrorKind::IllegalState);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_suspend_and_resume_across_contexts() {
    run_test(
        create_test_context,
        |ctx| {
            let tm = ctx.tm();
            let tx = ctx.begin_ambient()?;

            let suspended = tm.suspend(ctx.ctx())?;
            assert_eq!(suspended, Some(tx.clone()));
            assert!(ctx.active()?.is_none());
            assert_eq!(tm.suspend(ctx.ctx())?, None);

            // a suspended transaction may be resumed on another context
            let other = ContextId::detached();
            tm.resume(other, tx.clone())?;
            assert_eq!(tm.transaction(other)?, Some(tx.clone()));

            tm.begin(ctx.ctx())?;
            let occupied = tm.resume(ctx.ctx(), tx.clone()).unwrap_err();
            assert_eq!(occupied.kind(), &ErrorKind::InvalidTransaction);

            tm.commit(other)?;
            tm.rollback(ctx.ctx())?;

            let finished = tm.resume(other, tx).unwrap_err();
            assert_eq!(finished.kind(), &ErrorKind::InvalidTransaction);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_context_timeout_marks_rollback() {
    run_test(
        create_test_context,
        |ctx| {
            let tm = ctx.tm();
            tm.set_transaction_timeout(ctx.ctx(), 1)?;
            let tx = ctx.begin_ambient()?;

            let watched = tx.clone();
            awaitility::at_most(Duration::from_secs(5))
                .until(move || watched.status() == TransactionStatus::MarkedRollback);
            assert_eq!(tx.status(), TransactionStatus::MarkedRollback);

            assert!(tm.commit(ctx.ctx()).unwrap_err().is_rolled_back());

            // zero restores the configured default
            tm.set_transaction_timeout(ctx.ctx(), 0)?;
            let next = ctx.begin_ambient()?;
            assert_eq!(next.status(), TransactionStatus::Active);
            next.commit()
        },
        cleanup,
    )
}

#[test]
fn test_contexts_are_isolated() {
    run_test(
        create_test_context,
        |ctx| {
            let tm = ctx.tm();
            let other = ContextId::detached();

            tm.begin(ctx.ctx())?;
            tm.begin(other)?;
            let mine = ctx.require_active()?;
            let theirs = tm.transaction(other)?;
            assert!(theirs.is_some());
            assert_ne!(Some(mine.clone()), theirs);

            tm.rollback(other)?;
            assert_eq!(mine.status(), TransactionStatus::Active);
            mine.commit()
        },
        cleanup,
    )
}
