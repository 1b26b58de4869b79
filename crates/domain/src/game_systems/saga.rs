//! Saga ruleset.
//!
//! Exploding d10 pools built from ability + skill, where:
//! - wounds shrink the pool (one die per two wounds, never below one)
//! - ability tier sets both the explosion faces and the success threshold
//! - auto successes and trait bonuses add to the count, fatigue subtracts
//! - saga points pay for insurance and stake escalations

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::traits::RollHooks;
use crate::dice::{
    explosion_thresholds_for_tier, success_threshold_for_tier, DiceType, RawRollOutput, RollParams,
};
use crate::error::RollError;
use crate::roll::{
    AnimationGroup, AnimationSequence, DeclaredMode, EscalationGate, Outcome, RollContext,
    RollResult,
};

/// Saga points spent on insurance.
pub const INSURANCE_COST: u32 = 1;

/// Saga points staked on an escalation.
pub const ESCALATION_COST: u32 = 1;

/// Successes the base roll needs before an escalation is offered.
pub const ESCALATION_GATE: u32 = 3;

/// Gold used for the saga pool animation.
pub const SAGA_POOL_COLOR: &str = "#d4a017";

/// Roll parameters and modifiers resolved by `before_roll`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaData {
    /// Ability + skill
    pub base_pool: u32,
    pub wound_penalty: u32,
    /// Pool actually thrown
    pub pool: u32,
    pub threshold: u32,
    pub explosion_thresholds: BTreeSet<u32>,
    pub auto_bonus: u32,
    pub trait_bonus: u32,
    pub fatigue_malus: u32,
    pub difficulty: Option<u32>,
}

/// Saga game system.
pub struct SagaRuleset {
    slug: &'static str,
    name: &'static str,
}

impl SagaRuleset {
    pub fn new() -> Self {
        Self {
            slug: "saga",
            name: "Saga",
        }
    }

    /// Saga points a declared mode needs up front.
    pub fn mode_cost(mode: DeclaredMode) -> u32 {
        match mode {
            DeclaredMode::None => 0,
            DeclaredMode::Insurance => INSURANCE_COST,
            DeclaredMode::EscalatingTierA | DeclaredMode::EscalatingTierB => ESCALATION_COST,
        }
    }

    /// Combined successes an escalation must reach.
    pub fn escalation_target(mode: DeclaredMode) -> Option<u32> {
        match mode {
            DeclaredMode::EscalatingTierA => Some(4),
            DeclaredMode::EscalatingTierB => Some(5),
            _ => None,
        }
    }

    /// One die lost per two wounds.
    pub fn wound_penalty(wounds: u32) -> u32 {
        wounds / 2
    }

    fn outcome(final_successes: u32, difficulty: Option<u32>) -> Option<Outcome> {
        let target = difficulty?;
        Some(if final_successes >= target {
            Outcome::Success
        } else if final_successes > 0 {
            Outcome::Partial
        } else {
            Outcome::Failure
        })
    }
}

impl Default for SagaRuleset {
    fn default() -> Self {
        Self::new()
    }
}

impl RollHooks for SagaRuleset {
    type SystemData = SagaData;

    fn slug(&self) -> &str {
        self.slug
    }

    fn display_name(&self) -> &str {
        self.name
    }

    fn upfront_cost(&self, mode: DeclaredMode) -> u32 {
        match mode {
            DeclaredMode::Insurance => INSURANCE_COST,
            _ => 0,
        }
    }

    fn before_roll(
        &self,
        ctx: RollContext<SagaData>,
    ) -> Result<RollContext<SagaData>, RollError> {
        let character = &ctx.character;
        if character.is_incapacitated() {
            return Err(RollError::incapacitated(ctx.character_name.clone()));
        }

        let cost = Self::mode_cost(ctx.declared_mode);
        if character.saga_points < cost {
            return Err(RollError::insufficient_resource(
                "saga points",
                ctx.declared_mode.as_str(),
                cost,
                character.saga_points,
            ));
        }

        let base_pool = character.ability.saturating_add(character.skill);
        let wound_penalty = Self::wound_penalty(character.wounds);
        let data = SagaData {
            base_pool,
            wound_penalty,
            pool: base_pool.saturating_sub(wound_penalty).max(1),
            threshold: success_threshold_for_tier(character.ability_tier),
            explosion_thresholds: explosion_thresholds_for_tier(character.ability_tier),
            auto_bonus: character.auto_successes,
            trait_bonus: character.trait_bonus,
            fatigue_malus: character.fatigue,
            difficulty: ctx.roll_target,
        };

        Ok(ctx.with_system_data(data))
    }

    fn build_roll_params(&self, ctx: &RollContext<SagaData>) -> RollParams {
        let data = &ctx.system_data;
        RollParams::new(
            data.pool,
            data.explosion_thresholds.iter().copied(),
            data.threshold,
            DiceType::D10,
        )
    }

    fn after_roll(&self, raw: &RawRollOutput, ctx: &RollContext<SagaData>) -> RollResult {
        let data = &ctx.system_data;
        let final_successes = raw
            .successes
            .saturating_add(data.auto_bonus)
            .saturating_add(data.trait_bonus)
            .saturating_sub(data.fatigue_malus);

        let mut result = RollResult::from_raw(raw);
        result.successes = final_successes;
        result.outcome = Self::outcome(final_successes, data.difficulty);
        result.detail = json!({
            "basePool": data.base_pool,
            "woundPenalty": data.wound_penalty,
            "pool": data.pool,
            "rawSuccesses": raw.successes,
            "autoBonus": data.auto_bonus,
            "traitBonus": data.trait_bonus,
            "fatigueMalus": data.fatigue_malus,
            "finalSuccesses": final_successes,
            "difficulty": data.difficulty,
            "explosions": raw.flags.explosion_count(),
        });

        if ctx.declared_mode == DeclaredMode::Insurance {
            result.meta.resource_spent = INSURANCE_COST;
        }

        if final_successes >= ESCALATION_GATE {
            if let Some(final_target) = Self::escalation_target(ctx.declared_mode) {
                result.escalation = Some(EscalationGate {
                    final_target,
                    resource_cost: ESCALATION_COST,
                });
            }
        }

        result
    }

    fn build_animation_sequence(
        &self,
        raw: &RawRollOutput,
        ctx: &RollContext<SagaData>,
    ) -> AnimationSequence {
        AnimationSequence::single(vec![AnimationGroup::from_raw(
            "pool",
            DiceType::D10,
            SAGA_POOL_COLOR,
            ctx.label.clone(),
            raw,
        )])
    }
}
