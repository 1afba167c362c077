//! Interceptor factories and workloads for benchmarks

use crate::config::NestingProfile;
use txflow::errors::TxResult;
use txflow::{
    ContextId, LocalTransactionManager, Propagation, TransactionAttributes, TransactionInterceptor,
};

/// A transaction manager and an interceptor bound to it
pub struct BenchContext {
    tm: LocalTransactionManager,
    interceptor: TransactionInterceptor,
}

impl BenchContext {
    pub fn tm(&self) -> &LocalTransactionManager {
        &self.tm
    }

    pub fn interceptor(&self) -> &TransactionInterceptor {
        &self.interceptor
    }
}

/// Create a fresh benchmark context
pub fn create_context() -> TxResult<BenchContext> {
    let tm = LocalTransactionManager::builder()
        .tm_id("txflow-bench")
        .default_timeout(300)
        .build()?;
    let interceptor = TransactionInterceptor::new(tm.to_manager());
    log::debug!("Created benchmark context with manager '{}'", tm.config().tm_id());
    Ok(BenchContext { tm, interceptor })
}

/// Run `calls` outer calls shaped by `profile` on `ctx`, returning how many
/// finished successfully
pub fn run_profile(
    interceptor: &TransactionInterceptor,
    ctx: ContextId,
    profile: NestingProfile,
    calls: usize,
) -> usize {
    let outer = TransactionAttributes::new(Propagation::Requires);
    let inner = profile.inner().map(TransactionAttributes::new);
    let mut completed = 0;

    for _ in 0..calls {
        let result = interceptor.call(ctx, &outer, "bench.outer", || match &inner {
            Some(attributes) => interceptor.call(ctx, attributes, "bench.inner", || Ok(())),
            None => Ok(()),
        });
        if result.is_ok() {
            completed += 1;
        }
    }
    completed
}
