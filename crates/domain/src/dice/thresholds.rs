//! Ability tier to threshold mapping.
//!
//! Higher tiers explode on more faces and succeed on lower ones. Tiers above
//! [`MAX_ABILITY_TIER`] are clamped.

use std::collections::BTreeSet;

pub const MAX_ABILITY_TIER: u8 = 5;

/// Faces that explode for an ability tier.
pub fn explosion_thresholds_for_tier(tier: u8) -> BTreeSet<u32> {
    match tier.min(MAX_ABILITY_TIER) {
        0 | 1 => BTreeSet::from([10]),
        2 | 3 => BTreeSet::from([9, 10]),
        _ => BTreeSet::from([8, 9, 10]),
    }
}

/// Lowest face counted as a success for an ability tier.
pub fn success_threshold_for_tier(tier: u8) -> u32 {
    match tier.min(MAX_ABILITY_TIER) {
        0 => 8,
        1..=3 => 7,
        _ => 6,
    }
}

/// Lowest exploding face, used as `explodeMin` in notation.
pub fn explosion_floor(thresholds: &BTreeSet<u32>) -> Option<u32> {
    thresholds.iter().next().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explosions_widen_with_tier() {
        assert_eq!(explosion_thresholds_for_tier(0), BTreeSet::from([10]));
        assert_eq!(explosion_thresholds_for_tier(1), BTreeSet::from([10]));
        assert_eq!(explosion_thresholds_for_tier(2), BTreeSet::from([9, 10]));
        assert_eq!(explosion_thresholds_for_tier(3), BTreeSet::from([9, 10]));
        assert_eq!(explosion_thresholds_for_tier(4), BTreeSet::from([8, 9, 10]));
    }

    #[test]
    fn test_success_threshold_drops_with_tier() {
        assert_eq!(success_threshold_for_tier(0), 8);
        assert_eq!(success_threshold_for_tier(2), 7);
        assert_eq!(success_threshold_for_tier(5), 6);
    }

    #[test]
    fn test_tiers_above_max_are_clamped() {
        assert_eq!(
            explosion_thresholds_for_tier(200),
            explosion_thresholds_for_tier(MAX_ABILITY_TIER)
        );
        assert_eq!(success_threshold_for_tier(9), 6);
    }

    #[test]
    fn test_explosion_floor() {
        assert_eq!(explosion_floor(&BTreeSet::from([10, 9])), Some(9));
        assert_eq!(explosion_floor(&BTreeSet::new()), None);
    }
}
