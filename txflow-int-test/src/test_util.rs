use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use txflow::errors::{ErrorKind, TxError, TxResult};
use txflow::{
    ContextId, LocalTransactionManager, PropagationManager, Transaction, TransactionCallback,
    TransactionInterceptor, TransactionManagerProvider, TransactionStatus,
};

/// Runs a test with retry logic and error handling.
/// Tests run on the current thread so `ContextId::current()` stays stable
/// across `before`, `test` and `after`.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> TxResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> TxResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> TxResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();
        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", message)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

/// A fresh transaction manager, interceptor and execution context.
#[derive(Clone)]
pub struct TestContext {
    tm: LocalTransactionManager,
    interceptor: TransactionInterceptor,
    ctx: ContextId,
}

impl TestContext {
    pub fn new(tm: LocalTransactionManager) -> Self {
        let interceptor = TransactionInterceptor::new(tm.to_manager());
        TestContext {
            tm,
            interceptor,
            ctx: ContextId::detached(),
        }
    }

    pub fn tm(&self) -> &LocalTransactionManager {
        &self.tm
    }

    pub fn interceptor(&self) -> &TransactionInterceptor {
        &self.interceptor
    }

    pub fn pm(&self) -> &PropagationManager {
        self.interceptor.propagation_manager()
    }

    pub fn ctx(&self) -> ContextId {
        self.ctx
    }

    /// The transaction currently associated with the test context.
    pub fn active(&self) -> TxResult<Option<Transaction>> {
        self.tm.transaction(self.ctx)
    }

    pub fn require_active(&self) -> TxResult<Transaction> {
        self.active()?.ok_or_else(|| {
            TxError::new("expected an active transaction", ErrorKind::IllegalState)
        })
    }

    /// Begins a transaction outside of any propagation policy.
    pub fn begin_ambient(&self) -> TxResult<Transaction> {
        self.tm.begin(self.ctx)?;
        self.require_active()
    }
}

pub fn create_test_context() -> TxResult<TestContext> {
    let tm = LocalTransactionManager::builder()
        .tm_id("txflow-int-test")
        .default_timeout(60)
        .build()?;
    Ok(TestContext::new(tm))
}

/// Verifies the context was left balanced, then drops whatever remains.
pub fn cleanup(ctx: TestContext) -> TxResult<()> {
    let abandoned = ctx.pm().release_context(ctx.ctx());
    if let Some(tx) = ctx.active()? {
        log::warn!("Rolling back transaction {} left on {}", tx.id(), ctx.ctx());
        let _ = tx.rollback();
    }
    if !abandoned.is_empty() {
        return Err(TxError::new(
            &format!("{} suspended transaction(s) were never resumed", abandoned.len()),
            ErrorKind::StateViolation,
        ));
    }
    Ok(())
}

/// Collects the completion status reported to a transaction's
/// synchronizations.
#[derive(Clone, Default)]
pub struct StatusRecorder {
    seen: Arc<Mutex<Vec<TransactionStatus>>>,
}

impl StatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, tx: &Transaction) -> TxResult<()> {
        let seen = self.seen.clone();
        tx.register(move |status: TransactionStatus| seen.lock().push(status))
    }

    pub fn statuses(&self) -> Vec<TransactionStatus> {
        self.seen.lock().clone()
    }

    pub fn last(&self) -> Option<TransactionStatus> {
        self.seen.lock().last().copied()
    }
}

/// Records the transactions handed to a [`TransactionCallback`].
#[derive(Clone, Default)]
pub struct CallbackRecorder {
    committed: Arc<Mutex<Vec<Transaction>>>,
    rolled_back: Arc<Mutex<Vec<Transaction>>>,
}

impl CallbackRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> TransactionCallback {
        let committed = self.committed.clone();
        let rolled_back = self.rolled_back.clone();
        TransactionCallback::new()
            .on_committed(move |tx| committed.lock().push(tx.clone()))
            .on_rolled_back(move |tx| rolled_back.lock().push(tx.clone()))
    }

    pub fn committed(&self) -> Vec<Transaction> {
        self.committed.lock().clone()
    }

    pub fn rolled_back(&self) -> Vec<Transaction> {
        self.rolled_back.lock().clone()
    }
}
