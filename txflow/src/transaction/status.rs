use std::fmt::{Display, Formatter};

/// Lifecycle status of a transaction as reported by its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    NoTransaction,
    Active,
    MarkedRollback,
    Committed,
    RolledBack,
}

impl TransactionStatus {
    /// True for `Committed` and `RolledBack`.
    pub fn is_completed(&self) -> bool {
        matches!(self, TransactionStatus::Committed | TransactionStatus::RolledBack)
    }

    /// True while the transaction can still be joined, suspended or resumed.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TransactionStatus::Active | TransactionStatus::MarkedRollback)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionStatus::NoTransaction => "NO_TRANSACTION",
            TransactionStatus::Active => "ACTIVE",
            TransactionStatus::MarkedRollback => "MARKED_ROLLBACK",
            TransactionStatus::Committed => "COMMITTED",
            TransactionStatus::RolledBack => "ROLLEDBACK",
        };
        write!(f, "{}", name)
    }
}
