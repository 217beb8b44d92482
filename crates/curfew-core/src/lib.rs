//! Agent state machine for curfew
//!
//! This crate is the heart of curfewd, containing:
//! - The YouTube budget countdown (Idle <-> Counting)
//! - The per-tick engine turning fetch results into desired state
//! - Reconciliation of desired state against the host controllers
//! - The poll loop tying it together

mod agent;
mod budget;
mod engine;
mod events;
mod reconcile;

pub use agent::*;
pub use budget::*;
pub use engine::*;
pub use events::*;
pub use reconcile::*;
