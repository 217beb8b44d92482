//! Shared utilities for curfew
//!
//! This crate provides:
//! - The agent identity type (`AgentId`)
//! - Wall-clock helpers (mock time, clamped elapsed time, duration formatting)
//! - Error types
//! - Default paths for the configuration file

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
