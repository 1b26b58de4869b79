//! Explosion wave reconstruction.
//!
//! Regroups a flat, generation-ordered dice list into waves so playback can
//! show the initial pool and then each explosion generation without
//! re-rolling. Waves are cosmetic: a malformed list yields a partial result
//! instead of an error, and success counting never looks at waves.

use std::collections::BTreeSet;

use super::Wave;

/// Rebuild waves from a flat dice list.
///
/// Wave 0 is the first `pool` entries. Each following wave takes one entry per
/// exploding die of the previous wave. Stops when a wave has no triggers, when
/// the input is exhausted, or when the input is too short for the next wave.
pub fn build_waves(flat: &[u32], pool: u32, explosion_thresholds: &BTreeSet<u32>) -> Vec<Wave> {
    let mut waves = Vec::new();
    let mut cursor = (pool as usize).min(flat.len());

    if cursor == 0 {
        return waves;
    }
    waves.push(Wave {
        index: 0,
        dice: flat[..cursor].to_vec(),
    });

    loop {
        let Some(previous) = waves.last() else {
            break;
        };
        let triggers = previous
            .dice
            .iter()
            .filter(|face| explosion_thresholds.contains(face))
            .count();
        let remaining = flat.len() - cursor;
        if triggers == 0 || remaining == 0 || triggers > remaining {
            break;
        }

        let index = previous.index + 1;
        waves.push(Wave {
            index,
            dice: flat[cursor..cursor + triggers].to_vec(),
        });
        cursor += triggers;
    }

    waves
}
