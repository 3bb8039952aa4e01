//! Engine module - The simulated bus participants
//!
//! Provides:
//! - Request dispatch for a single device
//! - The session that fans broadcast requests out to every device
//! - Structured events for reporting

mod dispatcher;
mod events;
mod session;

pub use dispatcher::*;
pub use events::*;
pub use session::*;
