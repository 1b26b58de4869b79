//! Outbound notification port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vttdice_domain::{AnimationSequence, EscalationGate, RollId, RollResult, SessionId};

use super::error::BroadcastError;

/// Roll notification sent to everyone at a table session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RollEvent {
    #[serde(rename_all = "camelCase")]
    Resolved {
        roll_id: RollId,
        character_name: String,
        label: String,
        notation: String,
        result: RollResult,
        animation: AnimationSequence,
    },
    #[serde(rename_all = "camelCase")]
    EscalationOffered { roll_id: RollId, gate: EscalationGate },
    #[serde(rename_all = "camelCase")]
    EscalationSettled {
        roll_id: RollId,
        result: RollResult,
        animation: AnimationSequence,
    },
    #[serde(rename_all = "camelCase")]
    EscalationDeclined { roll_id: RollId },
}

impl RollEvent {
    pub fn roll_id(&self) -> RollId {
        match self {
            Self::Resolved { roll_id, .. }
            | Self::EscalationOffered { roll_id, .. }
            | Self::EscalationSettled { roll_id, .. }
            | Self::EscalationDeclined { roll_id } => *roll_id,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RollBroadcastPort: Send + Sync {
    async fn publish(&self, session_id: SessionId, event: RollEvent) -> Result<(), BroadcastError>;
}
