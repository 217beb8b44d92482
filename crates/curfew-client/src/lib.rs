//! HTTP client for the curfew policy store
//!
//! [`PolicyClient`] is the agent's [`curfew_api::PolicySource`] and also
//! carries the administrative calls used by `curfewctl`.

mod admin;
mod client;

pub use admin::*;
pub use client::*;
