//! # txflow
//!
//! Declarative transaction propagation for Rust.
//!
//! An operation declares how it relates to the transaction active on its
//! execution context (one of the six [`Propagation`] policies). The
//! [`PropagationManager`] turns that declaration into begin, join, suspend,
//! resume, commit and rollback calls on a pluggable [`TransactionManager`],
//! and the [`TransactionInterceptor`] wraps an operation with the matching
//! entry and exit steps.
//!
//! ```ignore
//! use txflow::{LocalTransactionManager, Propagation, TransactionAttributes, TransactionInterceptor};
//!
//! let tm = LocalTransactionManager::builder().default_timeout(30).build()?;
//! let interceptor = TransactionInterceptor::new(tm.to_manager());
//!
//! let attributes = TransactionAttributes::new(Propagation::Requires);
//! interceptor.call_current(&attributes, "accounts.transfer", || transfer(&from, &to, amount))?;
//! ```
//!
//! Execution contexts are explicit: every call takes a [`ContextId`].
//! [`ContextId::current`] maps the calling thread to a stable id for callers
//! that want thread-bound semantics.

pub mod common;
pub mod errors;
pub mod interceptor;
pub mod propagation;
pub mod transaction;

pub use common::ContextId;
pub use errors::{ErrorKind, TxError, TxResult};
pub use interceptor::TransactionInterceptor;
pub use propagation::{
    CompletionOutcome, Propagation, PropagationEventListener, PropagationEvents,
    PropagationManager, RollbackRules, TransactionAttributes, TransactionCallback,
    Transactional,
};
pub use transaction::local::{LocalTransactionManager, TransactionManagerBuilder};
pub use transaction::{
    Synchronization, Transaction, TransactionManager, TransactionManagerProvider,
    TransactionStatus, Xid,
};
