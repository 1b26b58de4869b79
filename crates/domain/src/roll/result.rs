//! Ruleset-interpreted roll results.

use serde::{Deserialize, Serialize};

use crate::dice::{RawRollOutput, RollFlags};

/// Ternary check outcome, present when the check had a difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Partial,
    Failure,
}

/// What two results of the same check compare by.
///
/// Pool rulesets count successes; a sum-based ruleset has no meaningful
/// success count and compares its total instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBasis {
    #[default]
    Successes,
    Total,
}

/// Bookkeeping of meta-mechanics layered on a roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollMeta {
    pub resource_spent: u32,
    pub resource_gained: u32,
    /// Discarded insurance roll
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_roll: Option<Box<RollResult>>,
    /// Which insurance roll was kept (1 or 2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kept_roll: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_roll: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_successes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saga_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
}

/// Offer to escalate a resolved roll with a bonus roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationGate {
    /// Combined successes the bonus phase must reach
    pub final_target: u32,
    /// Resource lost if the bonus phase fails
    pub resource_cost: u32,
}

/// Outcome of one roll shape after ruleset interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollResult {
    pub all_dice: Vec<u32>,
    /// Successes after ruleset adjustments
    pub successes: u32,
    /// Sum for sum-based rulesets; pool rulesets leave it empty
    pub total: Option<i32>,
    pub outcome: Option<Outcome>,
    pub flags: RollFlags,
    /// Opaque breakdown for UI surfaces
    pub detail: serde_json::Value,
    pub meta: RollMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationGate>,
}

impl RollResult {
    /// Raw successes, no total, no outcome, zeroed meta.
    pub fn from_raw(raw: &RawRollOutput) -> Self {
        Self {
            all_dice: raw.all_dice.clone(),
            successes: raw.successes,
            total: None,
            outcome: None,
            flags: raw.flags.clone(),
            detail: serde_json::Value::Null,
            meta: RollMeta::default(),
            escalation: None,
        }
    }

    /// Comparison score. Successes always win for pool results, even when
    /// a total is reported alongside; a total-based result without a total
    /// falls back to its successes.
    pub fn score(&self, basis: ScoreBasis) -> i64 {
        match (basis, self.total) {
            (ScoreBasis::Total, Some(total)) => i64::from(total),
            _ => i64::from(self.successes),
        }
    }

    /// Net change to the caller's resource implied by this result.
    pub fn resource_delta(&self) -> i64 {
        i64::from(self.meta.resource_gained) - i64::from(self.meta.resource_spent)
    }
}
