//! Roll contexts, interpreted results and everything derived from them.

mod animation;
mod context;
mod escalation;
mod history;
mod result;

pub use animation::{AnimationGroup, AnimationSequence};
pub use context::{CharacterSnapshot, DeclaredMode, RollContext};
pub use escalation::{EscalationError, EscalationFlow, ResourceAdjustment, RollPhase};
pub use history::{LegacyRollFields, RollHistoryRecord};
pub use result::{EscalationGate, Outcome, RollMeta, RollResult, ScoreBasis};
