use crate::common::ContextId;
use crate::errors::TxResult;
use crate::transaction::{Transaction, TransactionStatus};
use std::ops::Deref;
use std::sync::Arc;

/// Primitives of a JTA-style transaction manager.
///
/// Every call names the execution context it acts on. A context is
/// associated with at most one transaction at a time.
pub trait TransactionManagerProvider: Send + Sync {
    /// Starts a transaction and associates it with `ctx`.
    fn begin(&self, ctx: ContextId) -> TxResult<()>;

    fn commit(&self, ctx: ContextId) -> TxResult<()>;

    fn rollback(&self, ctx: ContextId) -> TxResult<()>;

    fn set_rollback_only(&self, ctx: ContextId) -> TxResult<()>;

    /// Status of the transaction associated with `ctx`, or
    /// `NoTransaction` when there is none.
    fn status(&self, ctx: ContextId) -> TxResult<TransactionStatus>;

    fn transaction(&self, ctx: ContextId) -> TxResult<Option<Transaction>>;

    /// Detaches the current transaction from `ctx` and returns it.
    fn suspend(&self, ctx: ContextId) -> TxResult<Option<Transaction>>;

    /// Re-associates a previously suspended transaction with `ctx`.
    fn resume(&self, ctx: ContextId, transaction: Transaction) -> TxResult<()>;

    /// Timeout in seconds for the next `begin` on `ctx`; 0 restores the
    /// manager default.
    fn set_transaction_timeout(&self, ctx: ContextId, seconds: u32) -> TxResult<()>;
}

/// Shared handle to a [`TransactionManagerProvider`].
#[derive(Clone)]
pub struct TransactionManager {
    inner: Arc<dyn TransactionManagerProvider>,
}

impl TransactionManager {
    pub fn new<T: TransactionManagerProvider + 'static>(inner: T) -> Self {
        TransactionManager {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for TransactionManager {
    type Target = Arc<dyn TransactionManagerProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
