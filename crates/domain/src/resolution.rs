//! Roll shapes.
//!
//! Each shape is a short synchronous pipeline over a [`RollHooks`]
//! implementation:
//! - [`roll`]: before_roll, build_roll_params, execute, after_roll, animation
//! - [`roll_with_insurance`]: one preparation, two independent draws, keep the better
//! - [`roll_saga_bonus`]: a fixed-size bonus pool continuing an already
//!   validated roll
//!
//! Nothing here suspends or touches a resource. Resource adjustments are
//! recorded in the result meta and applied by the caller once the shape
//! concludes.

use serde::{Deserialize, Serialize};

use crate::dice::{execute_roll, RawRollOutput, RollParams};
use crate::error::RollError;
use crate::game_systems::RollHooks;
use crate::roll::{AnimationSequence, RollContext, RollResult};

/// Dice thrown by the escalation bonus phase, whatever the ruleset's pool.
pub const SAGA_BONUS_POOL: u32 = 2;

/// Everything one roll shape produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolledCheck<D> {
    /// Context as enriched by `before_roll`
    pub context: RollContext<D>,
    pub params: RollParams,
    /// Audit notation of `params`
    pub notation: String,
    /// Raw output of the kept (or bonus) draw
    pub raw: RawRollOutput,
    pub result: RollResult,
    pub animation: AnimationSequence,
}

impl<D: Serialize> RolledCheck<D> {
    /// Erase the ruleset data to JSON so the check can cross a registry
    /// boundary.
    pub fn into_report(self) -> Result<RolledCheck<serde_json::Value>, RollError> {
        let system_data = serde_json::to_value(&self.context.system_data)
            .map_err(|e| RollError::InvalidSystemData(e.to_string()))?;

        Ok(RolledCheck {
            context: self.context.with_system_data(system_data),
            params: self.params,
            notation: self.notation,
            raw: self.raw,
            result: self.result,
            animation: self.animation,
        })
    }
}

struct Draw {
    raw: RawRollOutput,
    result: RollResult,
    animation: AnimationSequence,
}

fn prepare<H>(
    ctx: RollContext<H::SystemData>,
    hooks: &H,
) -> Result<(RollContext<H::SystemData>, RollParams), RollError>
where
    H: RollHooks + ?Sized,
{
    let ctx = hooks.before_roll(ctx)?;
    let params = hooks.build_roll_params(&ctx);
    params.validate()?;
    Ok((ctx, params))
}

fn draw<H, F>(
    ctx: &RollContext<H::SystemData>,
    params: &RollParams,
    hooks: &H,
    roll_die: &mut F,
) -> Draw
where
    H: RollHooks + ?Sized,
    F: FnMut(u32, u32) -> u32 + ?Sized,
{
    let raw = execute_roll(params, &mut *roll_die);
    let result = hooks.after_roll(&raw, ctx);
    let animation = hooks.build_animation_sequence(&raw, ctx);
    Draw {
        raw,
        result,
        animation,
    }
}

/// Resolve a single check.
pub fn roll<H, F>(
    ctx: RollContext<H::SystemData>,
    hooks: &H,
    roll_die: &mut F,
) -> Result<RolledCheck<H::SystemData>, RollError>
where
    H: RollHooks + ?Sized,
    F: FnMut(u32, u32) -> u32 + ?Sized,
{
    let (ctx, params) = prepare(ctx, hooks)?;
    let Draw {
        raw,
        result,
        animation,
    } = draw(&ctx, &params, hooks, roll_die);

    Ok(RolledCheck {
        notation: params.notation().to_string(),
        context: ctx,
        params,
        raw,
        result,
        animation,
    })
}

/// Roll twice with identical params and keep the better result.
///
/// Roll 1 is always drawn first. Results compare by [`RollResult::score`]
/// on the ruleset's [`RollHooks::score_basis`]; a tie keeps roll 1. The discarded result lands in `meta.second_roll`.
pub fn roll_with_insurance<H, F>(
    ctx: RollContext<H::SystemData>,
    hooks: &H,
    roll_die: &mut F,
) -> Result<RolledCheck<H::SystemData>, RollError>
where
    H: RollHooks + ?Sized,
    F: FnMut(u32, u32) -> u32 + ?Sized,
{
    let (ctx, params) = prepare(ctx, hooks)?;
    let first = draw(&ctx, &params, hooks, roll_die);
    let second = draw(&ctx, &params, hooks, roll_die);

    let basis = hooks.score_basis();
    let kept_roll: u8 = if first.result.score(basis) >= second.result.score(basis) {
        1
    } else {
        2
    };
    let animation = AnimationSequence::insurance(first.animation, second.animation, kept_roll);
    let ((raw, mut result), discarded) = if kept_roll == 1 {
        ((first.raw, first.result), second.result)
    } else {
        ((second.raw, second.result), first.result)
    };
    result.meta.second_roll = Some(Box::new(discarded));
    result.meta.kept_roll = Some(kept_roll);

    Ok(RolledCheck {
        notation: params.notation().to_string(),
        context: ctx,
        params,
        raw,
        result,
        animation,
    })
}

/// Throw the escalation bonus pool and fold it into `base`.
///
/// `before_roll` is not called again. The bonus succeeds only when it adds
/// at least one success AND the combined count reaches `final_target`.
pub fn roll_saga_bonus<H, F>(
    base: &RollResult,
    ctx: &RollContext<H::SystemData>,
    hooks: &H,
    final_target: u32,
    roll_die: &mut F,
) -> Result<RolledCheck<H::SystemData>, RollError>
where
    H: RollHooks + ?Sized,
    F: FnMut(u32, u32) -> u32 + ?Sized,
{
    let params = hooks.build_roll_params(ctx).with_pool(SAGA_BONUS_POOL);
    params.validate()?;

    let raw = execute_roll(&params, &mut *roll_die);
    let bonus_successes = raw.successes;
    let combined = base.successes.saturating_add(bonus_successes);
    let saga_success = bonus_successes >= 1 && combined >= final_target;
    let fail_reason = if saga_success {
        None
    } else if bonus_successes == 0 {
        Some("no bonus-roll success".to_string())
    } else {
        Some(format!("total insufficient ({}/{})", combined, final_target))
    };

    let mut result = base.clone();
    result.all_dice.extend_from_slice(&raw.all_dice);
    result.flags.exploded.extend_from_slice(&raw.flags.exploded);
    // A botch needs a 1 and no success anywhere in the combined dice
    result.flags.botched = result.all_dice.contains(&1)
        && !result.all_dice.iter().any(|face| params.is_success(*face));
    result.flags.critical |= raw.flags.critical;
    result.successes = combined;
    result.escalation = None;
    result.meta.bonus_roll = Some(raw.all_dice.clone());
    result.meta.bonus_successes = Some(bonus_successes);
    result.meta.saga_success = Some(saga_success);
    result.meta.fail_reason = fail_reason;

    let animation = hooks.build_animation_sequence(&raw, ctx);

    Ok(RolledCheck {
        notation: params.notation().to_string(),
        context: ctx.clone(),
        params,
        raw,
        result,
        animation,
    })
}
