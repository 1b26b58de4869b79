//! In-memory state storage modules.
//!
//! Stores manage runtime state that doesn't belong in the database:
//! - `PendingEscalationStore` - Rolls waiting on an escalation decision

pub mod pending_escalation;

pub use pending_escalation::{PendingEscalation, PendingEscalationStore};
