//! Enforcement capability interfaces for curfew
//!
//! This crate defines the interface between the agent core and the
//! platform-specific ways of locking a session and blocking domains.
//! It contains no platform code itself.

mod capabilities;
mod mock;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
