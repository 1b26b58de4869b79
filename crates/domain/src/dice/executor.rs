//! Pool execution with breadth-first explosions.
//!
//! Randomness is injected: `roll_die(min, max)` must return a face in the
//! inclusive range. Production callers pass a closure over their RNG port,
//! tests pass a scripted sequence.

use super::{build_waves, RawRollOutput, RollFlags, RollParams, MAX_POOL};

/// Hard cap on explosion generations, including the initial pool.
pub const MAX_EXPLOSION_WAVES: usize = 64;

/// Roll a pool, exploding generation by generation.
///
/// Every die of generation k is drawn before any die of generation k+1, and
/// each exploding die adds exactly one die to the next generation. Params are
/// expected to be validated already (see [`RollParams::validate`]).
pub fn execute_roll<F>(params: &RollParams, mut roll_die: F) -> RawRollOutput
where
    F: FnMut(u32, u32) -> u32,
{
    let sides = params.dice_type.sides();
    let mut all_dice = Vec::with_capacity(params.pool.min(MAX_POOL) as usize);
    let mut generation: Vec<u32> = (0..params.pool).map(|_| roll_die(1, sides)).collect();
    let mut generations = 0;

    loop {
        all_dice.extend_from_slice(&generation);
        generations += 1;

        let triggers = generation
            .iter()
            .filter(|face| params.is_explosion(**face))
            .count();
        if triggers == 0 || generations >= MAX_EXPLOSION_WAVES {
            break;
        }

        generation = (0..triggers).map(|_| roll_die(1, sides)).collect();
    }

    evaluate_dice(all_dice, params)
}

/// Evaluate an already drawn flat dice list (replays, physical dice).
///
/// Successes and flags come from `all_dice` alone, so a malformed list still
/// counts correctly even when its waves come out partial.
pub fn evaluate_dice(all_dice: Vec<u32>, params: &RollParams) -> RawRollOutput {
    let waves = build_waves(&all_dice, params.pool, &params.explosion_thresholds);
    let successes = all_dice.iter().filter(|face| params.is_success(**face)).count() as u32;
    let exploded: Vec<bool> = all_dice
        .iter()
        .map(|face| params.is_explosion(*face))
        .collect();
    let botched = successes == 0 && all_dice.contains(&1);
    let critical = waves.len() >= 3;

    RawRollOutput {
        all_dice,
        waves,
        successes,
        flags: RollFlags {
            exploded,
            botched,
            critical,
        },
    }
}
