//! Dice pool resolution for the virtual tabletop.
//!
//! Pure and synchronous: no I/O, no clock, no RNG. Dice are drawn through an
//! injected `roll_die(min, max)` closure so every roll is reproducible from
//! its inputs and the draw.

pub mod dice;
pub mod error;
pub mod game_systems;
pub mod ids;
pub mod resolution;
pub mod roll;

pub use error::{RollError, RollErrorPayload};

// Re-export dice mechanics
pub use dice::{
    build_waves, evaluate_dice, execute_roll, explosion_floor, explosion_thresholds_for_tier,
    success_threshold_for_tier, DiceType, NotationError, RawRollOutput, RollFlags, RollNotation,
    RollParams, Wave, MAX_ABILITY_TIER, MAX_EXPLOSION_WAVES, MAX_POOL,
};

// Re-export ruleset hooks and registry
pub use game_systems::{
    DieRoller, GenericRuleset, HookedRuleset, RollHooks, RollReport, Ruleset, RulesetRegistry,
    SagaData, SagaRuleset,
};

// Re-export roll shapes
pub use resolution::{roll, roll_saga_bonus, roll_with_insurance, RolledCheck, SAGA_BONUS_POOL};

// Re-export roll types
pub use roll::{
    AnimationGroup, AnimationSequence, CharacterSnapshot, DeclaredMode, EscalationError,
    EscalationFlow, EscalationGate, LegacyRollFields, Outcome, ResourceAdjustment, RollContext,
    RollHistoryRecord, RollMeta, RollPhase, RollResult, ScoreBasis,
};

// Re-export ID types
pub use ids::{CharacterId, RollId, SessionId};
