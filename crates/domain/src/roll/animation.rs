//! Animation sequences handed to the dice renderer.
//!
//! A sequence is a pure projection of already resolved dice: playback replays
//! the waves and never decides anything about the roll.

use serde::{Deserialize, Serialize};

use crate::dice::{DiceType, RawRollOutput, Wave};

/// One visually distinct set of dice (a pool, a bonus pool, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationGroup {
    pub id: String,
    pub dice_type: DiceType,
    pub color: String,
    pub label: String,
    pub waves: Vec<Wave>,
}

impl AnimationGroup {
    pub fn from_raw(
        id: impl Into<String>,
        dice_type: DiceType,
        color: impl Into<String>,
        label: impl Into<String>,
        raw: &RawRollOutput,
    ) -> Self {
        Self {
            id: id.into(),
            dice_type,
            color: color.into(),
            label: label.into(),
            waves: raw.waves.clone(),
        }
    }

    pub fn dice_count(&self) -> usize {
        self.waves.iter().map(|w| w.dice.len()).sum()
    }
}

/// Playback plan for one roll shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AnimationSequence {
    Single {
        groups: Vec<AnimationGroup>,
    },
    /// Both pools are shown before the keeper is revealed
    Insurance {
        groups1: Vec<AnimationGroup>,
        groups2: Vec<AnimationGroup>,
        #[serde(rename = "keptRoll")]
        kept_roll: u8,
    },
}

impl AnimationSequence {
    pub fn single(groups: Vec<AnimationGroup>) -> Self {
        Self::Single { groups }
    }

    /// Combine the sequences of two insurance rolls, in roll order.
    pub fn insurance(first: AnimationSequence, second: AnimationSequence, kept_roll: u8) -> Self {
        Self::Insurance {
            groups1: first.into_groups(),
            groups2: second.into_groups(),
            kept_roll,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Single { .. } => "single",
            Self::Insurance { .. } => "insurance",
        }
    }

    /// Every group in playback order.
    pub fn groups(&self) -> Vec<&AnimationGroup> {
        match self {
            Self::Single { groups } => groups.iter().collect(),
            Self::Insurance {
                groups1, groups2, ..
            } => groups1.iter().chain(groups2.iter()).collect(),
        }
    }

    pub fn into_groups(self) -> Vec<AnimationGroup> {
        match self {
            Self::Single { groups } => groups,
            Self::Insurance {
                mut groups1,
                groups2,
                ..
            } => {
                groups1.extend(groups2);
                groups1
            }
        }
    }
}
