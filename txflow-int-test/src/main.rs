use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use txflow::errors::{ErrorKind, TxError, TxResult};
use txflow::{ContextId, TransactionManagerProvider};
use txflow_derive::Transactional;
use txflow_int_test::test_util::{cleanup, create_test_context};

#[derive(Transactional)]
#[transactional(propagation = "REQUIRES")]
struct PlaceOrder;

#[derive(Transactional)]
#[transactional(propagation = "REQUIRES_NEW", no_rollback_for = "Duplicate")]
struct WriteAudit;

#[derive(Transactional)]
#[transactional(propagation = "NOT_SUPPORTED")]
struct Notify;

fn main() -> TxResult<()> {
    env_logger::init();
    println!("Starting stress test...");
    let ctx = create_test_context()?;

    let count = 100_000;
    let interceptor = ctx.interceptor();
    let id = ctx.ctx();

    let start = Instant::now();
    for i in 0..count {
        interceptor.invoke(id, &PlaceOrder, "orders.place", |_| {
            interceptor.invoke(id, &WriteAudit, "audit.write", |_| {
                if i % 10 == 0 {
                    Err(TxError::application("Duplicate", "audit entry exists"))
                } else {
                    Ok(())
                }
            })
            .or_else(|e| {
                if e.kind() == &ErrorKind::application("Duplicate") {
                    Ok(())
                } else {
                    Err(e)
                }
            })?;
            interceptor.invoke(id, &Notify, "orders.notify", |_| Ok(()))
        })?;
    }
    println!("Completed {} nested calls in {:?}", count, start.elapsed());

    let threads = 8;
    let per_thread = count / threads;
    let committed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let interceptor = interceptor.clone();
            let tm = ctx.tm().clone();
            let committed = Arc::clone(&committed);
            thread::spawn(move || -> TxResult<()> {
                for _ in 0..per_thread {
                    interceptor.invoke(ContextId::current(), &PlaceOrder, "orders.place", |_| {
                        tm.status(ContextId::current()).map(|_| ())
                    })?;
                    committed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| TxError::from("stress worker panicked"))??;
    }
    println!(
        "Committed {} transactions on {} threads in {:?}",
        committed.load(Ordering::Relaxed),
        threads,
        start.elapsed()
    );

    cleanup(ctx)
}
