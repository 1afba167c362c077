use crate::common::ContextId;
use crate::errors::{ErrorKind, TxError, TxResult};
use crate::transaction::{Synchronization, Transaction, TransactionProvider, TransactionStatus, Xid};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

pub(crate) type Associations = DashMap<ContextId, Transaction>;

/// In-memory transaction owned by a `LocalTransactionManager`.
///
/// Once completed, the transaction detaches itself from every context it is
/// still associated with.
pub(crate) struct LocalTransaction {
    xid: Xid,
    deadline: Instant,
    status: Mutex<TransactionStatus>,
    synchronizations: Mutex<Vec<Arc<dyn Synchronization>>>,
    associations: Weak<Associations>,
}

impl LocalTransaction {
    pub(crate) fn new(xid: Xid, timeout_secs: u32, associations: Weak<Associations>) -> Self {
        LocalTransaction {
            xid,
            deadline: Instant::now() + Duration::from_secs(u64::from(timeout_secs)),
            status: Mutex::new(TransactionStatus::Active),
            synchronizations: Mutex::new(Vec::new()),
            associations,
        }
    }

    fn current_status(&self) -> TransactionStatus {
        let mut status = self.status.lock();
        if *status == TransactionStatus::Active && Instant::now() >= self.deadline {
            log::warn!("Transaction {} timed out, marking it rollback-only", self.xid);
            *status = TransactionStatus::MarkedRollback;
        }
        *status
    }

    fn snapshot_synchronizations(&self) -> Vec<Arc<dyn Synchronization>> {
        self.synchronizations.lock().clone()
    }

    /// Moves an in-flight transaction to `requested`, or to `RolledBack` if
    /// it is rollback-only.
    fn transition(&self, requested: TransactionStatus, action: &str) -> TxResult<TransactionStatus> {
        // expire first so a timed-out transaction cannot commit
        let _ = self.current_status();
        let mut status = self.status.lock();
        match *status {
            TransactionStatus::Active => {
                *status = requested;
                Ok(requested)
            }
            TransactionStatus::MarkedRollback => {
                *status = TransactionStatus::RolledBack;
                Ok(TransactionStatus::RolledBack)
            }
            other => {
                log::error!("Cannot {} transaction {} in status {}", action, self.xid, other);
                Err(TxError::new(
                    &format!("Cannot {} transaction {} in status {}", action, self.xid, other),
                    ErrorKind::IllegalState,
                ))
            }
        }
    }

    fn after_completion(&self, outcome: TransactionStatus) {
        if let Some(associations) = self.associations.upgrade() {
            associations.retain(|_, tx| tx.id() != &self.xid);
        }

        let synchronizations = std::mem::take(&mut *self.synchronizations.lock());
        for synchronization in synchronizations {
            synchronization.after_completion(outcome);
        }
        log::debug!("Transaction {} completed with status {}", self.xid, outcome);
    }
}

impl TransactionProvider for LocalTransaction {
    fn xid(&self) -> &Xid {
        &self.xid
    }

    fn status(&self) -> TransactionStatus {
        self.current_status()
    }

    fn commit(&self) -> TxResult<()> {
        if self.current_status() == TransactionStatus::Active {
            for synchronization in self.snapshot_synchronizations() {
                synchronization.before_completion();
            }
        }

        let outcome = self.transition(TransactionStatus::Committed, "commit")?;
        self.after_completion(outcome);

        if outcome == TransactionStatus::RolledBack {
            return Err(TxError::new(
                &format!("Transaction {} was marked rollback-only and has been rolled back", self.xid),
                ErrorKind::RolledBack,
            ));
        }
        Ok(())
    }

    fn rollback(&self) -> TxResult<()> {
        let outcome = self.transition(TransactionStatus::RolledBack, "roll back")?;
        self.after_completion(outcome);
        Ok(())
    }

    fn set_rollback_only(&self) -> TxResult<()> {
        let mut status = self.status.lock();
        if status.is_in_flight() {
            *status = TransactionStatus::MarkedRollback;
            Ok(())
        } else {
            log::error!("Cannot mark transaction {} rollback-only in status {}", self.xid, *status);
            Err(TxError::new(
                &format!("Cannot mark transaction {} rollback-only in status {}", self.xid, *status),
                ErrorKind::IllegalState,
            ))
        }
    }

    fn register_synchronization(&self, synchronization: Arc<dyn Synchronization>) -> TxResult<()> {
        match self.current_status() {
            TransactionStatus::Active => {
                self.synchronizations.lock().push(synchronization);
                Ok(())
            }
            TransactionStatus::MarkedRollback => Err(TxError::new(
                &format!("Transaction {} is marked rollback-only", self.xid),
                ErrorKind::RolledBack,
            )),
            other => Err(TxError::new(
                &format!("Cannot register a synchronization with transaction {} in status {}", self.xid, other),
                ErrorKind::IllegalState,
            )),
        }
    }
}
