use backtrace::Backtrace;
use std::convert::Infallible;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::str::FromStr;

use crate::common::{atomic, Atomic};

/// The closed set of failure categories used across txflow.
///
/// Rollback rules match on these tags, so an application error that should
/// take part in rollback classification carries an [`ErrorKind::Application`]
/// tag naming its category.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum ErrorKind {
    // Propagation errors
    StateViolation,
    RolledBack,
    // Transaction manager errors
    NotSupported,
    IllegalState,
    InvalidTransaction,
    SystemError,
    HeuristicMixed,
    HeuristicRollback,
    // Configuration errors
    InvalidConfiguration,
    // Event bus errors
    EventError,
    // Business errors raised by intercepted operations, tagged by category
    Application(String),
    InternalError,
}

impl ErrorKind {
    /// Maps a textual tag to a kind.
    ///
    /// Names of the built-in kinds resolve to their variant, anything else
    /// becomes an [`ErrorKind::Application`] carrying the trimmed tag.
    pub fn from_tag(tag: &str) -> ErrorKind {
        match tag.trim() {
            "StateViolation" => ErrorKind::StateViolation,
            "RolledBack" => ErrorKind::RolledBack,
            "NotSupported" => ErrorKind::NotSupported,
            "IllegalState" => ErrorKind::IllegalState,
            "InvalidTransaction" => ErrorKind::InvalidTransaction,
            "SystemError" => ErrorKind::SystemError,
            "HeuristicMixed" => ErrorKind::HeuristicMixed,
            "HeuristicRollback" => ErrorKind::HeuristicRollback,
            "InvalidConfiguration" => ErrorKind::InvalidConfiguration,
            "EventError" => ErrorKind::EventError,
            "InternalError" => ErrorKind::InternalError,
            other => ErrorKind::Application(other.to_string()),
        }
    }

    /// Shorthand for an [`ErrorKind::Application`] tag.
    pub fn application(tag: &str) -> ErrorKind {
        ErrorKind::Application(tag.to_string())
    }
}

impl FromStr for ErrorKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ErrorKind::from_tag(s))
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::StateViolation => write!(f, "Propagation state violation"),
            ErrorKind::RolledBack => write!(f, "Transaction rolled back"),
            ErrorKind::NotSupported => write!(f, "Operation not supported"),
            ErrorKind::IllegalState => write!(f, "Illegal transaction state"),
            ErrorKind::InvalidTransaction => write!(f, "Invalid transaction"),
            ErrorKind::SystemError => write!(f, "Transaction system error"),
            ErrorKind::HeuristicMixed => write!(f, "Heuristic mixed outcome"),
            ErrorKind::HeuristicRollback => write!(f, "Heuristic rollback"),
            ErrorKind::InvalidConfiguration => write!(f, "Invalid configuration"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::Application(tag) => write!(f, "{} error", tag),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type returned by every fallible txflow operation.
///
/// Carries a message, a [`ErrorKind`] tag, an optional cause chain and the
/// backtrace captured at construction time.
#[derive(Clone)]
pub struct TxError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<TxError>>,
    backtrace: Atomic<Backtrace>,
}

impl TxError {
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        TxError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: TxError) -> Self {
        TxError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a business error tagged with an application category.
    pub fn application(tag: &str, message: &str) -> Self {
        TxError::new(message, ErrorKind::application(tag))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&TxError> {
        self.cause.as_deref()
    }

    /// Returns true if the error reports a rolled-back completion.
    pub fn is_rolled_back(&self) -> bool {
        self.error_kind == ErrorKind::RolledBack
    }
}

impl Display for TxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for TxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({})\nCaused by: {:?}", self.message, self.error_kind, cause),
            None => write!(f, "{} ({})\n{:?}", self.message, self.error_kind, self.backtrace.read()),
        }
    }
}

impl Error for TxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

pub type TxResult<T> = Result<T, TxError>;

impl From<std::fmt::Error> for TxError {
    fn from(err: std::fmt::Error) -> Self {
        TxError::new(&format!("Formatting error: {}", err), ErrorKind::InternalError)
    }
}

impl From<String> for TxError {
    fn from(msg: String) -> Self {
        TxError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for TxError {
    fn from(msg: &str) -> Self {
        TxError::new(msg, ErrorKind::InternalError)
    }
}
