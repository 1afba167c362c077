use txflow::errors::ErrorKind;
use txflow::{Propagation, TransactionStatus};
use txflow_int_test::test_util::{cleanup, create_test_context, run_test, CallbackRecorder};

// ==================== No ambient transaction ====================

#[test]
fn test_balanced_policies_leave_no_transaction() {
    for propagation in [
        Propagation::Requires,
        Propagation::RequiresNew,
        Propagation::Supported,
        Propagation::NotSupported,
        Propagation::Never,
    ] {
        run_test(
            create_test_context,
            move |ctx| {
                ctx.pm().on_entry(ctx.ctx(), propagation, 0, "balanced")?;
                ctx.pm().on_exit(ctx.ctx(), propagation, "balanced", None)?;
                assert!(ctx.active()?.is_none(), "{} left a transaction", propagation);
                assert_eq!(ctx.pm().owned_count(), 0);
                Ok(())
            },
            cleanup,
        )
    }
}

#[test]
fn test_requires_commits_what_it_began() {
    run_test(
        create_test_context,
        |ctx| {
            let recorder = CallbackRecorder::new();
            ctx.pm().on_entry(ctx.ctx(), Propagation::Requires, 0, "requires")?;
            let tx = ctx.require_active()?;
            assert_eq!(tx.status(), TransactionStatus::Active);

            ctx.pm()
                .on_exit(ctx.ctx(), Propagation::Requires, "requires", Some(&recorder.callback()))?;
            assert_eq!(recorder.committed(), vec![tx.clone()]);
            assert!(recorder.rolled_back().is_empty());
            assert_eq!(tx.status(), TransactionStatus::Committed);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_mandatory_requires_a_transaction() {
    run_test(
        create_test_context,
        |ctx| {
            let err = ctx
                .pm()
                .on_entry(ctx.ctx(), Propagation::Mandatory, 0, "billing.charge")
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StateViolation);
            assert!(err.message().contains("billing.charge"));
            assert!(ctx.active()?.is_none());
            Ok(())
        },
        cleanup,
    )
}

// ==================== Ambient transaction ====================

#[test]
fn test_joining_policies_keep_ambient_active() {
    for propagation in [Propagation::Requires, Propagation::Mandatory, Propagation::Supported] {
        run_test(
            create_test_context,
            move |ctx| {
                let ambient = ctx.begin_ambient()?;
                let recorder = CallbackRecorder::new();

                ctx.pm().on_entry(ctx.ctx(), propagation, 0, "join")?;
                assert_eq!(ctx.active()?, Some(ambient.clone()));
                assert!(ctx.pm().is_joined(&ambient));

                ctx.pm()
                    .on_exit(ctx.ctx(), propagation, "join", Some(&recorder.callback()))?;
                assert!(recorder.committed().is_empty());
                assert_eq!(ambient.status(), TransactionStatus::Active);
                assert_eq!(ctx.active()?, Some(ambient.clone()));

                ambient.commit()?;
                assert!(!ctx.pm().is_joined(&ambient));
                Ok(())
            },
            cleanup,
        )
    }
}

#[test]
fn test_not_supported_restores_ambient() {
    run_test(
        create_test_context,
        |ctx| {
            let ambient = ctx.begin_ambient()?;

            ctx.pm().on_entry(ctx.ctx(), Propagation::NotSupported, 0, "report")?;
            assert!(ctx.active()?.is_none());

            ctx.pm().on_exit(ctx.ctx(), Propagation::NotSupported, "report", None)?;
            assert_eq!(ctx.active()?, Some(ambient.clone()));
            assert_eq!(ambient.status(), TransactionStatus::Active);
            ambient.commit()
        },
        cleanup,
    )
}

#[test]
fn test_never_rejects_ambient() {
    run_test(
        create_test_context,
        |ctx| {
            let ambient = ctx.begin_ambient()?;
            let err = ctx.pm().on_entry(ctx.ctx(), Propagation::Never, 0, "never").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StateViolation);
            assert_eq!(ambient.status(), TransactionStatus::Active);
            ambient.rollback()
        },
        cleanup,
    )
}

#[test]
fn test_requires_new_runs_independently() {
    run_test(
        create_test_context,
        |ctx| {
            let outer = ctx.begin_ambient()?;
            let recorder = CallbackRecorder::new();

            ctx.pm().on_entry(ctx.ctx(), Propagation::RequiresNew, 0, "audit")?;
            let inner = ctx.require_active()?;
            assert_ne!(inner, outer);
            assert_eq!(inner.status(), TransactionStatus::Active);
            assert_eq!(ctx.pm().suspended_depth(ctx.ctx()), 1);

            ctx.pm()
                .on_exit(ctx.ctx(), Propagation::RequiresNew, "audit", Some(&recorder.callback()))?;
            assert_eq!(recorder.committed(), vec![inner.clone()]);
            assert_eq!(ctx.active()?, Some(outer.clone()));
            assert_eq!(outer.status(), TransactionStatus::Active);
            outer.commit()
        },
        cleanup,
    )
}

#[test]
fn test_requires_new_inner_rollback_spares_outer() {
    run_test(
        create_test_context,
        |ctx| {
            let outer = ctx.begin_ambient()?;
            let recorder = CallbackRecorder::new();

            ctx.pm().on_entry(ctx.ctx(), Propagation::RequiresNew, 0, "audit")?;
            let inner = ctx.require_active()?;
            inner.set_rollback_only()?;

            let outcome = ctx
                .pm()
                .on_exit(ctx.ctx(), Propagation::RequiresNew, "audit", Some(&recorder.callback()))?;
            assert!(outcome.map(|o| o.is_rolled_back()).unwrap_or(false));
            assert_eq!(recorder.rolled_back(), vec![inner.clone()]);
            assert_eq!(inner.status(), TransactionStatus::RolledBack);
            assert_eq!(outer.status(), TransactionStatus::Active);
            assert_eq!(ctx.active()?, Some(outer.clone()));
            outer.commit()
        },
        cleanup,
    )
}
