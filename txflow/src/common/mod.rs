mod atomic;
mod constants;
mod context;
mod event_bus;

pub use atomic::*;
pub use constants::*;
pub use context::*;
pub use event_bus::*;
