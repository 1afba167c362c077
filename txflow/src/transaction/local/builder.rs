use crate::errors::{TxError, TxResult};
use crate::transaction::local::{LocalTransactionManager, TransactionManagerConfig};

/// Fluent construction of a [`LocalTransactionManager`].
///
/// The first failing setter is remembered and reported by [`build`](Self::build).
#[derive(Default)]
pub struct TransactionManagerBuilder {
    error: Option<TxError>,
    config: TransactionManagerConfig,
}

impl TransactionManagerBuilder {
    pub fn new() -> Self {
        TransactionManagerBuilder {
            error: None,
            config: TransactionManagerConfig::new(),
        }
    }

    pub fn default_timeout(mut self, seconds: u32) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_default_timeout(seconds) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn tm_id(mut self, tm_id: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_tm_id(tm_id) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn build(self) -> TxResult<LocalTransactionManager> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(LocalTransactionManager::new(self.config))
    }
}
