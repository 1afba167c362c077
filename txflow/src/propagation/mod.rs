//! Declarative transaction propagation.
//!
//! [`PropagationManager`] decides, on entry to and exit from a demarcated
//! operation, whether to begin, join, suspend, resume, commit or roll back a
//! transaction according to the operation's [`Propagation`] policy.

mod attributes;
mod callback;
mod event;
mod manager;
mod policy;
mod rules;
mod suspension;

pub use attributes::*;
pub use callback::*;
pub use event::*;
pub use manager::*;
pub use policy::*;
pub use rules::*;
