use crate::errors::ErrorKind;
use crate::propagation::{Propagation, RollbackRules};

/// Declarative transaction settings of one operation.
///
/// A timeout of 0 means the transaction manager default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionAttributes {
    propagation: Propagation,
    timeout: u32,
    rules: RollbackRules,
}

impl TransactionAttributes {
    pub fn new(propagation: Propagation) -> Self {
        TransactionAttributes {
            propagation,
            timeout: 0,
            rules: RollbackRules::default(),
        }
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_rollback_for(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.rules = self.rules.with_rollback_for(kinds);
        self
    }

    pub fn with_no_rollback_for(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.rules = self.rules.with_no_rollback_for(kinds);
        self
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    pub fn rules(&self) -> &RollbackRules {
        &self.rules
    }
}

/// Implemented by operations that declare their transaction attributes,
/// usually through `#[derive(Transactional)]`.
pub trait Transactional {
    fn transaction_attributes(&self) -> TransactionAttributes;
}

impl Transactional for TransactionAttributes {
    fn transaction_attributes(&self) -> TransactionAttributes {
        self.clone()
    }
}
