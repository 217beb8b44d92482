//! Linux enforcement for curfew
//!
//! Provides:
//! - Session locking through `loginctl`
//! - YouTube blocking through a managed block in the hosts file
//! - Detection of what the host can actually enforce

mod capabilities;
mod command;
mod hosts;
mod lock;

pub use capabilities::*;
pub use hosts::*;
pub use lock::*;
