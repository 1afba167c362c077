use crate::common::{DEFAULT_TM_ID, DEFAULT_TRANSACTION_TIMEOUT, MAX_TM_ID_LENGTH};
use crate::errors::{ErrorKind, TxError, TxResult};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Settings of a [`LocalTransactionManager`](super::LocalTransactionManager).
///
/// Values can be changed until the manager is built; afterwards the
/// configuration is frozen and setters fail.
#[derive(Clone)]
pub struct TransactionManagerConfig {
    inner: Arc<TransactionManagerConfigInner>,
}

impl Default for TransactionManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManagerConfig {
    pub fn new() -> Self {
        TransactionManagerConfig {
            inner: Arc::new(TransactionManagerConfigInner {
                configured: AtomicBool::new(false),
                default_timeout: AtomicU32::new(DEFAULT_TRANSACTION_TIMEOUT),
                tm_id: OnceLock::new(),
            }),
        }
    }

    /// Timeout in seconds applied to transactions begun without an explicit
    /// timeout.
    pub fn default_timeout(&self) -> u32 {
        self.inner.default_timeout.load(Ordering::Relaxed)
    }

    pub fn set_default_timeout(&self, seconds: u32) -> TxResult<()> {
        self.inner.ensure_not_configured("default timeout")?;
        if seconds == 0 {
            log::error!("Default transaction timeout must be greater than zero");
            return Err(TxError::new(
                "Default transaction timeout must be greater than zero",
                ErrorKind::InvalidConfiguration,
            ));
        }
        self.inner.default_timeout.store(seconds, Ordering::Relaxed);
        Ok(())
    }

    /// Identifier embedded into minted xids.
    pub fn tm_id(&self) -> &str {
        self.inner.tm_id.get().map(String::as_str).unwrap_or(DEFAULT_TM_ID)
    }

    /// Sets the manager identifier, truncated to `MAX_TM_ID_LENGTH`
    /// characters. Can be set once.
    pub fn set_tm_id(&self, tm_id: &str) -> TxResult<()> {
        self.inner.ensure_not_configured("transaction manager id")?;
        let tm_id = tm_id.trim();
        if tm_id.is_empty() {
            log::error!("Transaction manager id cannot be empty");
            return Err(TxError::new(
                "Transaction manager id cannot be empty",
                ErrorKind::InvalidConfiguration,
            ));
        }

        let truncated: String = tm_id.chars().take(MAX_TM_ID_LENGTH).collect();
        if truncated.len() < tm_id.len() {
            log::warn!("Transaction manager id truncated to '{}'", truncated);
        }
        self.inner.tm_id.set(truncated).map_err(|_| {
            log::error!("Transaction manager id is already set");
            TxError::new(
                "Transaction manager id is already set",
                ErrorKind::InvalidConfiguration,
            )
        })
    }

    pub(crate) fn freeze(&self) {
        self.inner.configured.store(true, Ordering::Relaxed);
    }
}

struct TransactionManagerConfigInner {
    configured: AtomicBool,
    default_timeout: AtomicU32,
    tm_id: OnceLock<String>,
}

impl TransactionManagerConfigInner {
    fn ensure_not_configured(&self, setting: &str) -> TxResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            log::error!("The {} cannot be changed after the manager is built", setting);
            return Err(TxError::new(
                &format!("The {} cannot be changed after the manager is built", setting),
                ErrorKind::InvalidConfiguration,
            ));
        }
        Ok(())
    }
}
