use crate::errors::TxResult;
use crate::transaction::{Synchronization, TransactionStatus, Xid};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Operations a transaction manager exposes on one of its transactions.
pub trait TransactionProvider: Send + Sync {
    /// Identity of the transaction.
    fn xid(&self) -> &Xid;

    fn status(&self) -> TransactionStatus;

    /// Runs `before_completion` callbacks, then commits unless the
    /// transaction is rollback-only, in which case it rolls back and
    /// returns an [`ErrorKind::RolledBack`](crate::errors::ErrorKind) error.
    fn commit(&self) -> TxResult<()>;

    fn rollback(&self) -> TxResult<()>;

    fn set_rollback_only(&self) -> TxResult<()>;

    fn register_synchronization(&self, synchronization: Arc<dyn Synchronization>) -> TxResult<()>;
}

/// Shared handle to a transaction.
///
/// Cloning is cheap. Equality and hashing follow the [`Xid`], so two handles
/// obtained at different times for the same transaction compare equal.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<dyn TransactionProvider>,
}

impl Transaction {
    pub fn new<T: TransactionProvider + 'static>(inner: T) -> Self {
        Transaction {
            inner: Arc::new(inner),
        }
    }

    pub fn id(&self) -> &Xid {
        self.inner.xid()
    }

    /// Registers `synchronization` with the transaction.
    pub fn register<S: Synchronization + 'static>(&self, synchronization: S) -> TxResult<()> {
        self.inner.register_synchronization(Arc::new(synchronization))
    }
}

impl Deref for Transaction {
    type Target = Arc<dyn TransactionProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Transaction {}

impl Hash for Transaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state)
    }
}

impl Debug for Transaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("xid", &self.id().to_string())
            .field("status", &self.status())
            .finish()
    }
}
