//! Ruleset hook contract.
//!
//! A ruleset plugs into roll resolution through four hooks. Each has a
//! system-agnostic default, so a ruleset only overrides what it changes.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::dice::{RawRollOutput, RollParams};
use crate::error::RollError;
use crate::roll::{
    AnimationGroup, AnimationSequence, DeclaredMode, RollContext, RollResult, ScoreBasis,
};

/// Group id used by the default animation.
pub const DEFAULT_GROUP_ID: &str = "pool";

/// Neutral die color used by the default animation.
pub const DEFAULT_GROUP_COLOR: &str = "#e8e6e3";

/// Hooks a ruleset supplies to the roll pipeline.
pub trait RollHooks: Send + Sync {
    /// Ruleset enrichment carried on the context between hooks.
    type SystemData: Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync;

    /// Unique identifier used for registry lookup (e.g., "saga").
    fn slug(&self) -> &str;

    /// Human-readable name.
    fn display_name(&self) -> &str;

    /// What insurance compares the two draws by. Pool rulesets keep the
    /// default; sum-based rulesets return [`ScoreBasis::Total`].
    fn score_basis(&self) -> ScoreBasis {
        ScoreBasis::Successes
    }

    /// Resource a declared mode spends before any die is drawn. The caller
    /// reserves it up front and hands it back if the roll is rejected.
    fn upfront_cost(&self, _mode: DeclaredMode) -> u32 {
        0
    }

    /// Validate preconditions and enrich the context.
    ///
    /// Runs before any die is drawn; an error here aborts the action.
    fn before_roll(
        &self,
        ctx: RollContext<Self::SystemData>,
    ) -> Result<RollContext<Self::SystemData>, RollError> {
        Ok(ctx)
    }

    /// Resolve pool, thresholds and die type. Defaults to 1d10, exploding on
    /// 10, succeeding on 7+.
    fn build_roll_params(&self, _ctx: &RollContext<Self::SystemData>) -> RollParams {
        RollParams::default()
    }

    /// Interpret raw dice. Defaults to raw successes with no total, no
    /// outcome and zeroed meta.
    fn after_roll(&self, raw: &RawRollOutput, _ctx: &RollContext<Self::SystemData>) -> RollResult {
        RollResult::from_raw(raw)
    }

    /// Project raw waves into a playback plan. Defaults to one group.
    fn build_animation_sequence(
        &self,
        raw: &RawRollOutput,
        ctx: &RollContext<Self::SystemData>,
    ) -> AnimationSequence {
        let dice_type = self.build_roll_params(ctx).dice_type;
        AnimationSequence::single(vec![AnimationGroup::from_raw(
            DEFAULT_GROUP_ID,
            dice_type,
            DEFAULT_GROUP_COLOR,
            ctx.label.clone(),
            raw,
        )])
    }
}
