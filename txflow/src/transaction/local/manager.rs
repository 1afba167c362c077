use crate::common::ContextId;
use crate::errors::{ErrorKind, TxError, TxResult};
use crate::transaction::local::transaction::{Associations, LocalTransaction};
use crate::transaction::local::{TransactionManagerBuilder, TransactionManagerConfig};
use crate::transaction::{
    Transaction, TransactionManager, TransactionManagerProvider, TransactionStatus, XidFactory,
};
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory transaction manager.
///
/// Each [`ContextId`] is associated with at most one transaction. Nested
/// `begin` calls are rejected; use suspend and resume to run a transaction
/// inside another.
#[derive(Clone)]
pub struct LocalTransactionManager {
    inner: Arc<LocalTransactionManagerInner>,
}

impl Default for LocalTransactionManager {
    fn default() -> Self {
        Self::new(TransactionManagerConfig::new())
    }
}

impl LocalTransactionManager {
    pub fn builder() -> TransactionManagerBuilder {
        TransactionManagerBuilder::new()
    }

    pub fn new(config: TransactionManagerConfig) -> Self {
        config.freeze();
        let xid_factory = XidFactory::new(config.tm_id().as_bytes());
        log::debug!(
            "Local transaction manager '{}' started with default timeout {}s",
            config.tm_id(),
            config.default_timeout()
        );

        LocalTransactionManager {
            inner: Arc::new(LocalTransactionManagerInner {
                config,
                xid_factory,
                associations: Arc::new(DashMap::new()),
                timeouts: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &TransactionManagerConfig {
        &self.inner.config
    }

    pub fn xid_factory(&self) -> &XidFactory {
        &self.inner.xid_factory
    }

    /// Number of contexts currently associated with a transaction.
    pub fn associated_contexts(&self) -> usize {
        self.inner.associations.len()
    }

    /// Wraps this manager into a shareable [`TransactionManager`] handle.
    pub fn to_manager(&self) -> TransactionManager {
        TransactionManager::new(self.clone())
    }
}

impl TransactionManagerProvider for LocalTransactionManager {
    fn begin(&self, ctx: ContextId) -> TxResult<()> {
        self.inner.begin(ctx)
    }

    fn commit(&self, ctx: ContextId) -> TxResult<()> {
        self.inner.required(ctx, "commit")?.commit()
    }

    fn rollback(&self, ctx: ContextId) -> TxResult<()> {
        self.inner.required(ctx, "roll back")?.rollback()
    }

    fn set_rollback_only(&self, ctx: ContextId) -> TxResult<()> {
        self.inner.required(ctx, "mark rollback-only")?.set_rollback_only()
    }

    fn status(&self, ctx: ContextId) -> TxResult<TransactionStatus> {
        Ok(self
            .inner
            .associated(ctx)
            .map(|tx| tx.status())
            .unwrap_or(TransactionStatus::NoTransaction))
    }

    fn transaction(&self, ctx: ContextId) -> TxResult<Option<Transaction>> {
        Ok(self.inner.associated(ctx))
    }

    fn suspend(&self, ctx: ContextId) -> TxResult<Option<Transaction>> {
        let suspended = self.inner.associations.remove(&ctx).map(|(_, tx)| tx);
        if let Some(tx) = &suspended {
            log::trace!("Suspended transaction {} from {}", tx.id(), ctx);
        }
        Ok(suspended)
    }

    fn resume(&self, ctx: ContextId, transaction: Transaction) -> TxResult<()> {
        self.inner.resume(ctx, transaction)
    }

    fn set_transaction_timeout(&self, ctx: ContextId, seconds: u32) -> TxResult<()> {
        if seconds == 0 {
            self.inner.timeouts.remove(&ctx);
        } else {
            self.inner.timeouts.insert(ctx, seconds);
        }
        Ok(())
    }
}

struct LocalTransactionManagerInner {
    config: TransactionManagerConfig,
    xid_factory: XidFactory,
    associations: Arc<Associations>,
    timeouts: DashMap<ContextId, u32>,
}

impl LocalTransactionManagerInner {
    fn associated(&self, ctx: ContextId) -> Option<Transaction> {
        self.associations.get(&ctx).map(|entry| entry.value().clone())
    }

    fn required(&self, ctx: ContextId, action: &str) -> TxResult<Transaction> {
        self.associated(ctx).ok_or_else(|| {
            log::error!("Cannot {}: no transaction is associated with {}", action, ctx);
            TxError::new(
                &format!("Cannot {}: no transaction is associated with {}", action, ctx),
                ErrorKind::IllegalState,
            )
        })
    }

    fn begin(&self, ctx: ContextId) -> TxResult<()> {
        if let Some(existing) = self.associated(ctx) {
            if !existing.status().is_completed() {
                log::error!("Nested transactions are not supported, {} already runs {}", ctx, existing.id());
                return Err(TxError::new(
                    &format!("Nested transactions are not supported, {} already runs {}", ctx, existing.id()),
                    ErrorKind::NotSupported,
                ));
            }
        }

        let timeout = self
            .timeouts
            .get(&ctx)
            .map(|entry| *entry.value())
            .unwrap_or_else(|| self.config.default_timeout());
        let xid = self.xid_factory.create_xid();
        let transaction = Transaction::new(LocalTransaction::new(
            xid,
            timeout,
            Arc::downgrade(&self.associations),
        ));

        log::debug!("Began transaction {} on {} with timeout {}s", transaction.id(), ctx, timeout);
        self.associations.insert(ctx, transaction);
        Ok(())
    }

    fn resume(&self, ctx: ContextId, transaction: Transaction) -> TxResult<()> {
        let status = transaction.status();
        if !status.is_in_flight() {
            log::error!("Cannot resume transaction {} in status {}", transaction.id(), status);
            return Err(TxError::new(
                &format!("Cannot resume transaction {} in status {}", transaction.id(), status),
                ErrorKind::InvalidTransaction,
            ));
        }

        match self.associations.entry(ctx) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                let current = entry.get().id().clone();
                drop(entry);
                log::error!("Cannot resume transaction {}: {} is already associated with {}", transaction.id(), ctx, current);
                Err(TxError::new(
                    &format!("Cannot resume transaction {}: {} is already associated with {}", transaction.id(), ctx, current),
                    ErrorKind::InvalidTransaction,
                ))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                log::trace!("Resumed transaction {} on {}", transaction.id(), ctx);
                entry.insert(transaction);
                Ok(())
            }
        }
    }
}
