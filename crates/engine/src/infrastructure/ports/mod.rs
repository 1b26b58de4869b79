//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Roll history storage (could swap SQLite -> Postgres)
//! - Spendable resources (owned by the character store, not the engine)
//! - Session broadcast (could swap in-process channels -> WebSocket fan-out)
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

pub use error::{BroadcastError, RepoError};
pub use external::{RollBroadcastPort, RollEvent};
pub use repos::{ResourceRepo, RollHistoryRepo};
pub use testing::{ClockPort, RandomPort};

#[cfg(test)]
pub use external::MockRollBroadcastPort;
#[cfg(test)]
pub use repos::{MockResourceRepo, MockRollHistoryRepo};
