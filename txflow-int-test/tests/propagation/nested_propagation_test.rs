use parking_lot::Mutex;
use std::sync::Arc;
use txflow::errors::{ErrorKind, TxError};
use txflow::propagation::PropagationEventInfo;
use txflow::{
    Propagation, PropagationEventListener, PropagationEvents, TransactionAttributes,
    TransactionInterceptor, TransactionStatus,
};
use txflow_int_test::test_util::{cleanup, create_test_context, run_test, StatusRecorder};

fn attrs(propagation: Propagation) -> TransactionAttributes {
    TransactionAttributes::new(propagation)
}

#[test]
fn test_nested_calls_restore_each_level() {
    run_test(
        create_test_context,
        |ctx| {
            let interceptor = ctx.interceptor();
            let id = ctx.ctx();

            interceptor.call(id, &attrs(Propagation::Requires), "outer", || {
                let outer = ctx.require_active()?;

                interceptor.call(id, &attrs(Propagation::RequiresNew), "audit", || {
                    let audit = ctx.require_active()?;
                    assert_ne!(audit, outer);

                    interceptor.call(id, &attrs(Propagation::NotSupported), "notify", || {
                        assert!(ctx.active()?.is_none());

                        interceptor.call(id, &attrs(Propagation::Supported), "lookup", || {
                            assert!(ctx.active()?.is_none());
                            Ok(())
                        })
                    })?;

                    assert_eq!(ctx.active()?, Some(audit.clone()));
                    interceptor.call(id, &attrs(Propagation::Mandatory), "write", || {
                        assert_eq!(ctx.active()?, Some(audit.clone()));
                        Ok(())
                    })
                })?;

                assert_eq!(ctx.active()?, Some(outer.clone()));
                assert_eq!(outer.status(), TransactionStatus::Active);
                Ok(())
            })?;

            assert!(ctx.active()?.is_none());
            assert_eq!(ctx.pm().owned_count(), 0);
            assert_eq!(ctx.pm().joined_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_inner_failure_dooms_shared_transaction() {
    run_test(
        create_test_context,
        |ctx| {
            let interceptor = ctx.interceptor();
            let id = ctx.ctx();
            let recorder = StatusRecorder::new();

            let result = interceptor.call(id, &attrs(Propagation::Requires), "checkout", || {
                recorder.attach(&ctx.require_active()?)?;

                let inner: Result<(), TxError> =
                    interceptor.call(id, &attrs(Propagation::Mandatory), "reserve", || {
                        Err(TxError::application("OutOfStock", "no items left"))
                    });
                assert_eq!(
                    inner.unwrap_err().kind(),
                    &ErrorKind::application("OutOfStock")
                );
                assert_eq!(ctx.require_active()?.status(), TransactionStatus::MarkedRollback);
                Ok("swallowed")
            });

            // the outer operation returned normally but its transaction was doomed
            let err = result.unwrap_err();
            assert!(err.is_rolled_back());
            assert_eq!(recorder.statuses(), vec![TransactionStatus::RolledBack]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nested_requires_on_same_manager_completes_on_inner_exit() {
    run_test(
        create_test_context,
        |ctx| {
            let interceptor = ctx.interceptor();
            let id = ctx.ctx();
            let recorder = StatusRecorder::new();

            interceptor.call(id, &attrs(Propagation::Requires), "outer", || {
                recorder.attach(&ctx.require_active()?)?;
                interceptor.call(id, &attrs(Propagation::Requires), "inner", || Ok(()))?;
                // the manager owns the shared transaction, so the inner exit committed it
                assert!(ctx.active()?.is_none());
                Ok(())
            })?;

            assert_eq!(recorder.statuses(), vec![TransactionStatus::Committed]);
            assert_eq!(ctx.pm().owned_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nested_requires_on_other_manager_participates() {
    run_test(
        create_test_context,
        |ctx| {
            let interceptor = ctx.interceptor();
            let participant = TransactionInterceptor::new(ctx.tm().to_manager());
            let id = ctx.ctx();
            let recorder = StatusRecorder::new();

            interceptor.call(id, &attrs(Propagation::Requires), "outer", || {
                let outer = ctx.require_active()?;
                recorder.attach(&outer)?;
                participant.call(id, &attrs(Propagation::Requires), "inner", || {
                    assert!(participant.propagation_manager().is_joined(&outer));
                    assert!(!participant.propagation_manager().is_owned(&outer));
                    Ok(())
                })?;
                assert_eq!(ctx.active()?, Some(outer.clone()));
                Ok(())
            })?;

            assert_eq!(recorder.statuses(), vec![TransactionStatus::Committed]);
            assert_eq!(participant.propagation_manager().joined_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_no_rollback_for_keeps_shared_transaction() {
    run_test(
        create_test_context,
        |ctx| {
            let interceptor = ctx.interceptor();
            let id = ctx.ctx();
            let recorder = StatusRecorder::new();
            let lenient = attrs(Propagation::Mandatory)
                .with_no_rollback_for([ErrorKind::application("NotFound")]);

            interceptor.call(id, &attrs(Propagation::Requires), "lookup-or-create", || {
                recorder.attach(&ctx.require_active()?)?;
                let found: Result<(), TxError> = interceptor.call(id, &lenient, "lookup", || {
                    Err(TxError::application("NotFound", "no such customer"))
                });
                assert!(found.is_err());
                assert_eq!(ctx.require_active()?.status(), TransactionStatus::Active);
                Ok(())
            })?;

            assert_eq!(recorder.last(), Some(TransactionStatus::Committed));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_requires_new_failure_spares_outer() {
    run_test(
        create_test_context,
        |ctx| {
            let interceptor = ctx.interceptor();
            let id = ctx.ctx();
            let outer_recorder = StatusRecorder::new();
            let inner_recorder = StatusRecorder::new();

            interceptor.call(id, &attrs(Propagation::Requires), "order", || {
                outer_recorder.attach(&ctx.require_active()?)?;
                let audit: Result<(), TxError> =
                    interceptor.call(id, &attrs(Propagation::RequiresNew), "audit", || {
                        inner_recorder.attach(&ctx.require_active()?)?;
                        Err(TxError::application("AuditDown", "audit store unavailable"))
                    });
                assert!(audit.is_err());
                assert_eq!(ctx.require_active()?.status(), TransactionStatus::Active);
                Ok(())
            })?;

            assert_eq!(inner_recorder.statuses(), vec![TransactionStatus::RolledBack]);
            assert_eq!(outer_recorder.statuses(), vec![TransactionStatus::Committed]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_event_sequence_for_nested_requires_new() {
    run_test(
        create_test_context,
        |ctx| {
            let events = Arc::new(Mutex::new(Vec::new()));
            let sink = events.clone();
            let subscriber = ctx.pm().subscribe(PropagationEventListener::new(move |info: PropagationEventInfo| {
                sink.lock().push((info.event(), info.operation_id().to_string()));
                Ok(())
            }))?;

            let interceptor = ctx.interceptor();
            let id = ctx.ctx();
            interceptor.call(id, &attrs(Propagation::Requires), "outer", || {
                interceptor.call(id, &attrs(Propagation::Supported), "read", || Ok(()))?;
                interceptor.call(id, &attrs(Propagation::RequiresNew), "inner", || Ok(()))
            })?;

            let expected = vec![
                (PropagationEvents::Begun, "outer".to_string()),
                (PropagationEvents::Joined, "read".to_string()),
                (PropagationEvents::Suspended, "inner".to_string()),
                (PropagationEvents::Begun, "inner".to_string()),
                (PropagationEvents::Committed, "inner".to_string()),
                (PropagationEvents::Resumed, "inner".to_string()),
                (PropagationEvents::Committed, "outer".to_string()),
            ];
            assert_eq!(*events.lock(), expected);

            if let Some(subscriber) = subscriber {
                ctx.pm().unsubscribe(subscriber)?;
            }
            Ok(())
        },
        cleanup,
    )
}
