use crate::transaction::Transaction;
use std::fmt::{Debug, Formatter};

type CompletionHook = Box<dyn Fn(&Transaction) + Send + Sync>;

/// Optional hooks invoked when an exit completes a transaction.
///
/// Exactly one hook fires per completion: `on_committed` after a successful
/// commit, `on_rolled_back` when the commit resolved as a rollback.
#[derive(Default)]
pub struct TransactionCallback {
    on_committed: Option<CompletionHook>,
    on_rolled_back: Option<CompletionHook>,
}

impl TransactionCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_committed(mut self, hook: impl Fn(&Transaction) + Send + Sync + 'static) -> Self {
        self.on_committed = Some(Box::new(hook));
        self
    }

    pub fn on_rolled_back(mut self, hook: impl Fn(&Transaction) + Send + Sync + 'static) -> Self {
        self.on_rolled_back = Some(Box::new(hook));
        self
    }

    pub(crate) fn committed(&self, transaction: &Transaction) {
        if let Some(hook) = &self.on_committed {
            hook(transaction);
        }
    }

    pub(crate) fn rolled_back(&self, transaction: &Transaction) {
        if let Some(hook) = &self.on_rolled_back {
            hook(transaction);
        }
    }
}

impl Debug for TransactionCallback {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCallback")
            .field("on_committed", &self.on_committed.is_some())
            .field("on_rolled_back", &self.on_rolled_back.is_some())
            .finish()
    }
}

/// How an exit completed the transaction it owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Committed(Transaction),
    RolledBack(Transaction),
}

impl CompletionOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            CompletionOutcome::Committed(tx) | CompletionOutcome::RolledBack(tx) => tx,
        }
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, CompletionOutcome::RolledBack(_))
    }
}
