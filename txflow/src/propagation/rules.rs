use crate::errors::ErrorKind;

/// Decides whether an error raised inside a transaction dooms it.
///
/// An error matching `no_rollback_for` never marks the transaction. With an
/// empty `rollback_for` list every other error marks it; otherwise only the
/// listed kinds do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackRules {
    rollback_for: Vec<ErrorKind>,
    no_rollback_for: Vec<ErrorKind>,
}

impl RollbackRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rollback_for(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.rollback_for.extend(kinds);
        self
    }

    pub fn with_no_rollback_for(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.no_rollback_for.extend(kinds);
        self
    }

    pub fn rollback_for(&self) -> &[ErrorKind] {
        &self.rollback_for
    }

    pub fn no_rollback_for(&self) -> &[ErrorKind] {
        &self.no_rollback_for
    }

    pub fn should_mark_rollback(&self, kind: &ErrorKind) -> bool {
        if self.no_rollback_for.contains(kind) {
            return false;
        }
        self.rollback_for.is_empty() || self.rollback_for.contains(kind)
    }
}
