//! Transaction manager abstraction and the in-memory local implementation.

mod handle;
pub mod local;
mod manager;
mod status;
mod synchronization;
mod xid;

pub use handle::*;
pub use manager::*;
pub use status::*;
pub use synchronization::*;
pub use xid::*;
