use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_CONTEXT: ContextId = ContextId::detached();
}

/// Identifies one logical thread of execution.
///
/// Transaction association, suspension stacks and timeouts are all keyed by
/// a `ContextId`. Every OS thread gets its own id through
/// [`ContextId::current`]; callers that multiplex work over a thread pool can
/// mint independent ids with [`ContextId::detached`] and carry them along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// The context bound to the calling thread.
    pub fn current() -> ContextId {
        THREAD_CONTEXT.with(|ctx| *ctx)
    }

    /// A fresh context not bound to any thread.
    pub fn detached() -> ContextId {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for ContextId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}
