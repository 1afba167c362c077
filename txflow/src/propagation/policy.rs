use crate::errors::{ErrorKind, TxError};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How an operation relates to the transaction active on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Propagation {
    /// Join the active transaction, or begin and own a new one.
    #[default]
    Requires,
    /// Suspend any active transaction and always run in a new one.
    RequiresNew,
    /// Join the active transaction; fail when there is none.
    Mandatory,
    /// Join the active transaction if there is one.
    Supported,
    /// Run outside any transaction, suspending the active one.
    NotSupported,
    /// Fail when a transaction is active.
    Never,
}

impl Propagation {
    pub const ALL: [Propagation; 6] = [
        Propagation::Requires,
        Propagation::RequiresNew,
        Propagation::Mandatory,
        Propagation::Supported,
        Propagation::NotSupported,
        Propagation::Never,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Propagation::Requires => "REQUIRES",
            Propagation::RequiresNew => "REQUIRES_NEW",
            Propagation::Mandatory => "MANDATORY",
            Propagation::Supported => "SUPPORTED",
            Propagation::NotSupported => "NOT_SUPPORTED",
            Propagation::Never => "NEVER",
        }
    }
}

impl Display for Propagation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Propagation {
    type Err = TxError;

    /// Accepts the policy names case-insensitively, with `_`, `-` or a space
    /// as word separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Propagation::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                TxError::new(
                    &format!("Unknown propagation policy '{}'", s),
                    ErrorKind::InvalidConfiguration,
                )
            })
    }
}
