//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod broadcast;
pub mod clock;
pub mod ports;
pub mod resources;
pub mod roll_history;
