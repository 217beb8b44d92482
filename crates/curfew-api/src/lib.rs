//! Policy types and wire protocol for curfew
//!
//! This crate defines what the agent exchanges with the policy store:
//! - The desired `Policy` and the agent-local `EnforcementState`
//! - Wire types of the policy store HTTP API
//! - The `PolicySource` seam and its error taxonomy
//! - A scripted policy source for tests

mod mock;
mod source;
mod types;
mod wire;

pub use mock::*;
pub use source::*;
pub use types::*;
pub use wire::*;
