//! Dice pool mechanics.
//!
//! The leaf layer of roll resolution. Nothing here knows about rulesets:
//! - `thresholds` - ability tier to explosion/success thresholds
//! - `notation` - compact audit notation (`3d10!>=9>=7`)
//! - `executor` - draws a pool with breadth-first explosions
//! - `waves` - regroups a flat dice list into explosion generations

mod executor;
mod notation;
mod thresholds;
mod waves;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use executor::{evaluate_dice, execute_roll, MAX_EXPLOSION_WAVES};
pub use notation::{NotationError, RollNotation};
pub use thresholds::{
    explosion_floor, explosion_thresholds_for_tier, success_threshold_for_tier, MAX_ABILITY_TIER,
};
pub use waves::build_waves;

use crate::error::RollError;

/// Largest pool a single roll may throw before explosions.
pub const MAX_POOL: u32 = 100;

/// Kind of die thrown by a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiceType {
    D6,
    #[default]
    D10,
    D12,
    D20,
}

impl DiceType {
    pub fn sides(&self) -> u32 {
        match self {
            DiceType::D6 => 6,
            DiceType::D10 => 10,
            DiceType::D12 => 12,
            DiceType::D20 => 20,
        }
    }
}

impl fmt::Display for DiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

impl FromStr for DiceType {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d6" => Ok(DiceType::D6),
            "d10" => Ok(DiceType::D10),
            "d12" => Ok(DiceType::D12),
            "d20" => Ok(DiceType::D20),
            other => Err(NotationError::UnknownDiceType(other.to_string())),
        }
    }
}

/// Fully resolved parameters of one pool roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollParams {
    /// Dice rolled before explosions
    pub pool: u32,
    /// Face values that add one more die to the next wave
    pub explosion_thresholds: BTreeSet<u32>,
    /// Face value at or above which a die is a success
    pub threshold: u32,
    pub dice_type: DiceType,
}

impl Default for RollParams {
    fn default() -> Self {
        Self {
            pool: 1,
            explosion_thresholds: BTreeSet::from([10]),
            threshold: 7,
            dice_type: DiceType::D10,
        }
    }
}

impl RollParams {
    pub fn new(
        pool: u32,
        explosion_thresholds: impl IntoIterator<Item = u32>,
        threshold: u32,
        dice_type: DiceType,
    ) -> Self {
        Self {
            pool,
            explosion_thresholds: explosion_thresholds.into_iter().collect(),
            threshold,
            dice_type,
        }
    }

    /// Same shape with a different pool size.
    pub fn with_pool(mut self, pool: u32) -> Self {
        self.pool = pool;
        self
    }

    /// Check the caller contract of [`execute_roll`].
    pub fn validate(&self) -> Result<(), RollError> {
        let sides = self.dice_type.sides();
        if self.pool == 0 {
            return Err(RollError::invalid_params("pool must be at least 1"));
        }
        if self.pool > MAX_POOL {
            return Err(RollError::invalid_params(format!(
                "pool of {} exceeds the maximum of {}",
                self.pool, MAX_POOL
            )));
        }
        if self.explosion_thresholds.is_empty() {
            return Err(RollError::invalid_params(
                "explosion thresholds must not be empty",
            ));
        }
        if let Some(face) = self
            .explosion_thresholds
            .iter()
            .find(|face| **face < 1 || **face > sides)
        {
            return Err(RollError::invalid_params(format!(
                "explosion face {} is not on a {}",
                face, self.dice_type
            )));
        }
        if self.explosion_thresholds.len() as u32 >= sides {
            return Err(RollError::invalid_params(
                "every face explodes, the chain would never end",
            ));
        }
        if self.threshold < 1 || self.threshold > sides {
            return Err(RollError::invalid_params(format!(
                "success threshold {} is not on a {}",
                self.threshold, self.dice_type
            )));
        }
        Ok(())
    }

    pub fn is_explosion(&self, face: u32) -> bool {
        self.explosion_thresholds.contains(&face)
    }

    pub fn is_success(&self, face: u32) -> bool {
        face >= self.threshold
    }

    pub fn notation(&self) -> RollNotation {
        RollNotation::from(self)
    }
}

/// One generation of an explosion chain (wave 0 is the initial pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wave {
    pub index: usize,
    pub dice: Vec<u32>,
}

/// Flags derived from a flat dice list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollFlags {
    /// One entry per die in `all_dice`; true when that die triggered an explosion
    pub exploded: Vec<bool>,
    /// No successes and at least one die showing 1
    pub botched: bool,
    /// An explosion die itself exploded
    pub critical: bool,
}

impl RollFlags {
    pub fn explosion_count(&self) -> usize {
        self.exploded.iter().filter(|e| **e).count()
    }
}

/// Uninterpreted output of one pool roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRollOutput {
    /// Every die in generation order
    pub all_dice: Vec<u32>,
    pub waves: Vec<Wave>,
    /// Count of `all_dice` at or above the threshold
    pub successes: u32,
    pub flags: RollFlags,
}
