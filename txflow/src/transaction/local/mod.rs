//! In-memory transaction manager.
//!
//! [`LocalTransactionManager`] keeps no log and enlists no resources. It
//! provides real begin/commit/rollback/suspend/resume semantics over
//! per-context associations, which is all propagation needs.

mod builder;
mod config;
mod manager;
mod transaction;

pub use builder::*;
pub use config::*;
pub use manager::*;
