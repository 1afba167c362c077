use crate::common::{
    atomic, Atomic, ContextId, ReadExecutor, SubscriberRef, TxEventBus, WriteExecutor,
};
use crate::errors::{ErrorKind, TxError, TxResult};
use crate::propagation::suspension::SuspensionStacks;
use crate::propagation::{
    CompletionOutcome, Propagation, PropagationEventInfo, PropagationEventListener,
    PropagationEvents, RollbackRules, TransactionCallback,
};
use crate::transaction::{Synchronization, Transaction, TransactionManager, TransactionStatus, Xid};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

/// Applies propagation policies on behalf of demarcated operations.
///
/// Every `on_entry` must be paired with exactly one `on_exit` or `on_error`
/// for the same context and policy. The manager remembers which
/// transactions it began (`owned`) and which pre-existing ones it joined
/// (`joined`); only owned transactions are ever completed by an exit.
#[derive(Clone)]
pub struct PropagationManager {
    inner: Arc<PropagationManagerInner>,
}

impl PropagationManager {
    pub fn new(transaction_manager: TransactionManager) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        log::debug!("Propagation manager {} created", id);
        PropagationManager {
            inner: Arc::new(PropagationManagerInner {
                id,
                transaction_manager,
                state: atomic(PropagationState::default()),
                suspended: SuspensionStacks::default(),
                event_bus: TxEventBus::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.inner.transaction_manager
    }

    /// Prepares `ctx` for an operation declared with `propagation`.
    ///
    /// `timeout` (seconds, 0 for the manager default) applies only when a
    /// transaction is begun.
    pub fn on_entry(
        &self,
        ctx: ContextId,
        propagation: Propagation,
        timeout: u32,
        operation_id: &str,
    ) -> TxResult<()> {
        self.inner.on_entry(ctx, propagation, timeout, operation_id)
    }

    /// Finishes a successful operation.
    ///
    /// Returns the outcome when this exit completed a transaction the
    /// manager owned.
    pub fn on_exit(
        &self,
        ctx: ContextId,
        propagation: Propagation,
        operation_id: &str,
        callback: Option<&TransactionCallback>,
    ) -> TxResult<Option<CompletionOutcome>> {
        self.inner.on_exit(ctx, propagation, operation_id, callback)
    }

    /// Finishes an operation that failed with `error`.
    ///
    /// The active transaction is marked rollback-only when `rules` classify
    /// the error that way, then the exit runs as for a successful operation.
    pub fn on_error(
        &self,
        ctx: ContextId,
        error: &TxError,
        propagation: Propagation,
        rules: &RollbackRules,
        operation_id: &str,
        callback: Option<&TransactionCallback>,
    ) -> TxResult<Option<CompletionOutcome>> {
        self.inner.on_error(ctx, error, propagation, rules, operation_id, callback)
    }

    pub fn subscribe(&self, listener: PropagationEventListener) -> TxResult<Option<SubscriberRef>> {
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> TxResult<()> {
        self.inner.event_bus.deregister(subscriber)
    }

    /// Drops the suspension stack of `ctx` and hands back the transactions
    /// it still held, oldest first. Nothing is resumed or completed.
    pub fn release_context(&self, ctx: ContextId) -> Vec<Transaction> {
        let abandoned = self.inner.suspended.release(ctx);
        if !abandoned.is_empty() {
            log::warn!("Released {} abandoned suspended transaction(s) of {}", abandoned.len(), ctx);
        }
        abandoned
    }

    pub fn is_owned(&self, transaction: &Transaction) -> bool {
        self.inner.state.read_with(|state| state.owned.contains(transaction))
    }

    pub fn is_joined(&self, transaction: &Transaction) -> bool {
        self.inner.state.read_with(|state| state.joined.contains(transaction))
    }

    pub fn owned_count(&self) -> usize {
        self.inner.state.read_with(|state| state.owned.len())
    }

    pub fn joined_count(&self) -> usize {
        self.inner.state.read_with(|state| state.joined.len())
    }

    pub fn suspended_depth(&self, ctx: ContextId) -> usize {
        self.inner.suspended.depth(ctx)
    }

    /// Number of contexts holding at least one suspended transaction.
    pub fn suspended_contexts(&self) -> usize {
        self.inner.suspended.contexts()
    }
}

#[derive(Default)]
struct PropagationState {
    joined: HashSet<Transaction>,
    owned: HashSet<Transaction>,
}

/// Removes a completed transaction from the joined set.
struct JoinedCompletionListener {
    xid: Xid,
    state: Weak<RwLock<PropagationState>>,
}

impl Synchronization for JoinedCompletionListener {
    fn after_completion(&self, status: TransactionStatus) {
        if let Some(state) = self.state.upgrade() {
            state.write().joined.retain(|tx| tx.id() != &self.xid);
        }
        log::trace!("Transaction {} completed with {}, no longer joined", self.xid, status);
    }
}

struct PropagationManagerInner {
    id: String,
    transaction_manager: TransactionManager,
    state: Atomic<PropagationState>,
    suspended: SuspensionStacks,
    event_bus: TxEventBus<PropagationEventInfo, PropagationEventListener>,
}

impl PropagationManagerInner {
    fn on_entry(
        &self,
        ctx: ContextId,
        propagation: Propagation,
        timeout: u32,
        operation_id: &str,
    ) -> TxResult<()> {
        let current = self.active_transaction(ctx)?;
        log::trace!("Entering '{}' on {} with {}", operation_id, ctx, propagation);

        match propagation {
            Propagation::Requires => match current {
                Some(tx) => self.join(ctx, &tx, operation_id),
                None => {
                    let tx = self.begin(ctx, timeout, operation_id)?;
                    if let Err(e) = self.register_listener(&tx) {
                        self.abandon(&tx);
                        return Err(e);
                    }
                    self.state.write_with(|state| state.owned.insert(tx));
                    Ok(())
                }
            },
            Propagation::Mandatory => match current {
                Some(tx) => self.join(ctx, &tx, operation_id),
                None => Err(self.state_violation(&format!(
                    "The operation '{}' must be called inside a transaction",
                    operation_id
                ))),
            },
            Propagation::Supported => match current {
                Some(tx) => self.join(ctx, &tx, operation_id),
                None => Ok(()),
            },
            Propagation::NotSupported => match current {
                Some(tx) => self.suspend(ctx, tx, operation_id),
                None => Ok(()),
            },
            Propagation::Never => match current {
                Some(tx) => Err(self.state_violation(&format!(
                    "The operation '{}' must not be called inside a transaction, but {} is active",
                    operation_id,
                    tx.id()
                ))),
                None => Ok(()),
            },
            Propagation::RequiresNew => {
                let suspended = match current {
                    Some(tx) => {
                        self.suspend(ctx, tx, operation_id)?;
                        true
                    }
                    None => false,
                };

                match self.begin(ctx, timeout, operation_id) {
                    Ok(tx) => {
                        self.state.write_with(|state| state.owned.insert(tx));
                        Ok(())
                    }
                    Err(e) => {
                        if suspended {
                            if let Err(resume_error) = self.resume_last(ctx, operation_id) {
                                log::error!(
                                    "Failed to resume the suspended transaction of '{}' after begin failed: {}",
                                    operation_id,
                                    resume_error
                                );
                            }
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    fn on_exit(
        &self,
        ctx: ContextId,
        propagation: Propagation,
        operation_id: &str,
        callback: Option<&TransactionCallback>,
    ) -> TxResult<Option<CompletionOutcome>> {
        let noop = TransactionCallback::default();
        let callback = callback.unwrap_or(&noop);
        let current = self.active_transaction(ctx)?;
        log::trace!("Exiting '{}' on {} with {}", operation_id, ctx, propagation);

        match propagation {
            Propagation::Requires => match current {
                Some(tx) if self.owns(&tx) => self.complete(ctx, tx, operation_id, callback).map(Some),
                _ => Ok(None),
            },
            Propagation::Mandatory | Propagation::Supported | Propagation::Never => Ok(None),
            Propagation::NotSupported => {
                if self.suspended.is_empty(ctx) {
                    return Ok(None);
                }
                match current {
                    Some(tx) => Err(self.state_violation(&format!(
                        "Cannot resume the transaction suspended by '{}': {} is already active on {}",
                        operation_id,
                        tx.id(),
                        ctx
                    ))),
                    None => {
                        self.resume_last(ctx, operation_id)?;
                        Ok(None)
                    }
                }
            }
            Propagation::RequiresNew => {
                let outcome = match current {
                    Some(tx) => self.complete(ctx, tx, operation_id, callback),
                    None => Err(self.state_violation(&format!(
                        "The operation '{}' has no transaction to complete on {}",
                        operation_id, ctx
                    ))),
                };

                let resumed = if self.suspended.is_empty(ctx) {
                    Ok(())
                } else {
                    self.restore_outer(ctx, operation_id)
                };

                let outcome = outcome?;
                resumed?;
                Ok(Some(outcome))
            }
        }
    }

    fn on_error(
        &self,
        ctx: ContextId,
        error: &TxError,
        propagation: Propagation,
        rules: &RollbackRules,
        operation_id: &str,
        callback: Option<&TransactionCallback>,
    ) -> TxResult<Option<CompletionOutcome>> {
        if let Some(tx) = self.active_transaction(ctx)? {
            if rules.should_mark_rollback(error.kind()) {
                log::debug!(
                    "Marking transaction {} rollback-only after '{}' failed: {}",
                    tx.id(),
                    operation_id,
                    error
                );
                tx.set_rollback_only()?;
            } else {
                log::debug!(
                    "Error of kind {:?} in '{}' does not doom transaction {}",
                    error.kind(),
                    operation_id,
                    tx.id()
                );
            }
        }
        self.on_exit(ctx, propagation, operation_id, callback)
    }

    fn active_transaction(&self, ctx: ContextId) -> TxResult<Option<Transaction>> {
        Ok(self
            .transaction_manager
            .transaction(ctx)?
            .filter(|tx| tx.status() != TransactionStatus::NoTransaction))
    }

    fn owns(&self, tx: &Transaction) -> bool {
        self.state.read_with(|state| state.owned.contains(tx))
    }

    fn begin(&self, ctx: ContextId, timeout: u32, operation_id: &str) -> TxResult<Transaction> {
        self.transaction_manager.set_transaction_timeout(ctx, timeout)?;
        self.transaction_manager.begin(ctx)?;
        let tx = self.active_transaction(ctx)?.ok_or_else(|| {
            log::error!("Transaction manager reported no transaction on {} right after begin", ctx);
            TxError::new(
                &format!("Transaction manager reported no transaction on {} right after begin", ctx),
                ErrorKind::SystemError,
            )
        })?;

        log::debug!("Began transaction {} for '{}' on {}", tx.id(), operation_id, ctx);
        self.publish(PropagationEvents::Begun, &tx, ctx, operation_id);
        Ok(tx)
    }

    fn join(&self, ctx: ContextId, tx: &Transaction, operation_id: &str) -> TxResult<()> {
        let first_join = self.state.write_with(|state| state.joined.insert(tx.clone()));
        if !first_join {
            return Ok(());
        }

        if let Err(e) = self.register_listener(tx) {
            self.state.write_with(|state| state.joined.remove(tx));
            return Err(e);
        }

        log::debug!("'{}' joined transaction {} on {}", operation_id, tx.id(), ctx);
        self.publish(PropagationEvents::Joined, tx, ctx, operation_id);
        Ok(())
    }

    fn register_listener(&self, tx: &Transaction) -> TxResult<()> {
        tx.register(JoinedCompletionListener {
            xid: tx.id().clone(),
            state: Arc::downgrade(&self.state),
        })
    }

    /// Rolls back a transaction begun on entry that could not be set up.
    fn abandon(&self, tx: &Transaction) {
        if let Err(e) = tx.rollback() {
            log::error!("Failed to roll back abandoned transaction {}: {}", tx.id(), e);
        }
    }

    fn suspend(&self, ctx: ContextId, tx: Transaction, operation_id: &str) -> TxResult<()> {
        let suspended = self.transaction_manager.suspend(ctx)?.unwrap_or(tx);
        log::debug!("Suspended transaction {} for '{}' on {}", suspended.id(), operation_id, ctx);
        self.publish(PropagationEvents::Suspended, &suspended, ctx, operation_id);
        self.suspended.push(ctx, suspended);
        Ok(())
    }

    fn resume_last(&self, ctx: ContextId, operation_id: &str) -> TxResult<()> {
        let Some(tx) = self.suspended.pop(ctx) else {
            return Ok(());
        };

        self.transaction_manager.resume(ctx, tx.clone())?;
        log::debug!("Resumed transaction {} after '{}' on {}", tx.id(), operation_id, ctx);
        self.publish(PropagationEvents::Resumed, &tx, ctx, operation_id);
        Ok(())
    }

    /// Detaches whatever the manager still associates with `ctx`, then
    /// resumes the most recently suspended transaction.
    fn restore_outer(&self, ctx: ContextId, operation_id: &str) -> TxResult<()> {
        if let Some(leftover) = self.transaction_manager.suspend(ctx)? {
            log::warn!(
                "Transaction {} was still associated with {} when '{}' exited, detaching it",
                leftover.id(),
                ctx,
                operation_id
            );
        }
        self.resume_last(ctx, operation_id)
    }

    fn complete(
        &self,
        ctx: ContextId,
        tx: Transaction,
        operation_id: &str,
        callback: &TransactionCallback,
    ) -> TxResult<CompletionOutcome> {
        let result = tx.commit();
        self.state.write_with(|state| state.owned.remove(&tx));

        match result {
            Ok(()) => {
                log::debug!("Committed transaction {} of '{}' on {}", tx.id(), operation_id, ctx);
                self.publish(PropagationEvents::Committed, &tx, ctx, operation_id);
                callback.committed(&tx);
                Ok(CompletionOutcome::Committed(tx))
            }
            Err(e) if e.is_rolled_back() => {
                log::debug!("Transaction {} of '{}' on {} was rolled back: {}", tx.id(), operation_id, ctx, e);
                self.publish(PropagationEvents::RolledBack, &tx, ctx, operation_id);
                callback.rolled_back(&tx);
                Ok(CompletionOutcome::RolledBack(tx))
            }
            Err(e) => {
                log::error!("Failed to commit transaction {} of '{}' on {}: {}", tx.id(), operation_id, ctx, e);
                Err(e)
            }
        }
    }

    fn state_violation(&self, message: &str) -> TxError {
        log::error!("{}", message);
        TxError::new(message, ErrorKind::StateViolation)
    }

    fn publish(&self, event: PropagationEvents, tx: &Transaction, ctx: ContextId, operation_id: &str) {
        if !self.event_bus.has_listeners() {
            return;
        }

        let info = PropagationEventInfo::new(event, tx.id().clone(), ctx, operation_id);
        if let Err(e) = self.event_bus.publish(info) {
            log::warn!("Failed to publish {:?} for transaction {}: {}", event, tx.id(), e);
        }
    }
}
