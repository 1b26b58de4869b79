//! Roll history records.
//!
//! A record carries the full serialized result alongside the flattened shape
//! older clients read. Both are always written together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RollContext, RollResult};
use crate::dice::RollParams;
use crate::ids::{CharacterId, RollId, SessionId};

/// Flattened pre-hook record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRollFields {
    pub roll_type: String,
    pub roll_target: Option<u32>,
    pub pool: u32,
    pub threshold: u32,
    pub results: Vec<u32>,
    pub successes: u32,
    pub resource_spent: u32,
    pub resource_gained: u32,
}

/// One persisted roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollHistoryRecord {
    pub roll_id: RollId,
    pub character_id: CharacterId,
    pub character_name: String,
    pub session_id: SessionId,
    pub system_slug: String,
    pub label: String,
    pub notation: String,
    pub created_at: DateTime<Utc>,
    pub result: RollResult,
    #[serde(flatten)]
    pub legacy: LegacyRollFields,
}

impl RollHistoryRecord {
    pub fn new<D>(
        roll_id: RollId,
        ctx: &RollContext<D>,
        params: &RollParams,
        notation: impl Into<String>,
        result: RollResult,
        created_at: DateTime<Utc>,
    ) -> Self {
        let legacy = LegacyRollFields {
            roll_type: ctx.roll_type.clone(),
            roll_target: ctx.roll_target,
            pool: params.pool,
            threshold: params.threshold,
            results: result.all_dice.clone(),
            successes: result.successes,
            resource_spent: result.meta.resource_spent,
            resource_gained: result.meta.resource_gained,
        };

        Self {
            roll_id,
            character_id: ctx.character_id,
            character_name: ctx.character_name.clone(),
            session_id: ctx.session_id,
            system_slug: ctx.system_slug.clone(),
            label: ctx.label.clone(),
            notation: notation.into(),
            created_at,
            result,
            legacy,
        }
    }

    /// Refresh the flattened fields after the result changed (bonus roll,
    /// resource settlement).
    pub fn with_result(mut self, result: RollResult) -> Self {
        self.legacy.results = result.all_dice.clone();
        self.legacy.successes = result.successes;
        self.legacy.resource_spent = result.meta.resource_spent;
        self.legacy.resource_gained = result.meta.resource_gained;
        self.result = result;
        self
    }
}
