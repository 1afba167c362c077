use crate::transaction::TransactionStatus;

/// Callback pair attached to a transaction and driven by its completion.
///
/// `before_completion` runs only ahead of a commit attempt, while the
/// transaction can still be marked rollback-only. `after_completion` runs
/// once the final status is known, for commit and rollback alike.
pub trait Synchronization: Send + Sync {
    fn before_completion(&self) {}

    fn after_completion(&self, status: TransactionStatus);
}

impl<F> Synchronization for F
where
    F: Fn(TransactionStatus) + Send + Sync,
{
    fn after_completion(&self, status: TransactionStatus) {
        self(status)
    }
}
