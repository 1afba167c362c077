use crate::common::ContextId;
use crate::errors::{ErrorKind, TxError, TxResult};
use crate::propagation::{
    CompletionOutcome, PropagationManager, TransactionAttributes, Transactional,
};
use crate::transaction::TransactionManager;

/// Wraps operations with transaction demarcation.
///
/// `on_entry` runs before the operation. A successful operation is followed
/// by `on_exit`, a failed one by `on_error`, and the operation's own error
/// is always the one returned to the caller.
///
/// ```ignore
/// let interceptor = TransactionInterceptor::new(LocalTransactionManager::default().to_manager());
/// let attributes = TransactionAttributes::new(Propagation::RequiresNew);
/// let total = interceptor.call_current(&attributes, "orders.place", || place_order(&order))?;
/// ```
#[derive(Clone)]
pub struct TransactionInterceptor {
    propagation: PropagationManager,
}

impl TransactionInterceptor {
    pub fn new(transaction_manager: TransactionManager) -> Self {
        TransactionInterceptor {
            propagation: PropagationManager::new(transaction_manager),
        }
    }

    pub fn with_propagation_manager(propagation: PropagationManager) -> Self {
        TransactionInterceptor { propagation }
    }

    pub fn propagation_manager(&self) -> &PropagationManager {
        &self.propagation
    }

    /// Runs `operation` on `ctx` under `attributes`.
    ///
    /// When the operation succeeds but the transaction it owned resolves as a
    /// rollback, an [`ErrorKind::RolledBack`] error is returned instead of
    /// the operation's value.
    pub fn call<R, F>(
        &self,
        ctx: ContextId,
        attributes: &TransactionAttributes,
        operation_id: &str,
        operation: F,
    ) -> TxResult<R>
    where
        F: FnOnce() -> TxResult<R>,
    {
        let propagation = attributes.propagation();
        self.propagation
            .on_entry(ctx, propagation, attributes.timeout(), operation_id)?;

        match operation() {
            Ok(value) => match self.propagation.on_exit(ctx, propagation, operation_id, None)? {
                Some(CompletionOutcome::RolledBack(tx)) => Err(TxError::new(
                    &format!(
                        "Transaction {} of '{}' was rolled back instead of committed",
                        tx.id(),
                        operation_id
                    ),
                    ErrorKind::RolledBack,
                )),
                _ => Ok(value),
            },
            Err(error) => {
                if let Err(secondary) = self.propagation.on_error(
                    ctx,
                    &error,
                    propagation,
                    attributes.rules(),
                    operation_id,
                    None,
                ) {
                    log::error!(
                        "Failed to finish the transaction of '{}' after it failed with '{}': {}",
                        operation_id,
                        error,
                        secondary
                    );
                }
                Err(error)
            }
        }
    }

    /// [`call`](Self::call) on the calling thread's context.
    pub fn call_current<R, F>(
        &self,
        attributes: &TransactionAttributes,
        operation_id: &str,
        operation: F,
    ) -> TxResult<R>
    where
        F: FnOnce() -> TxResult<R>,
    {
        self.call(ContextId::current(), attributes, operation_id, operation)
    }

    /// [`call`](Self::call) with the attributes declared by `target`.
    pub fn invoke<T, R, F>(&self, ctx: ContextId, target: &T, operation_id: &str, operation: F) -> TxResult<R>
    where
        T: Transactional + ?Sized,
        F: FnOnce(&T) -> TxResult<R>,
    {
        let attributes = target.transaction_attributes();
        self.call(ctx, &attributes, operation_id, || operation(target))
    }
}
