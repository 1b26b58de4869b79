//! Rolls waiting on an escalation decision.
//!
//! An entry lives from the moment the gate is offered until the player
//! confirms or declines. There is no timeout: an abandoned entry stays until
//! the session is torn down.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use vttdice_domain::{EscalationFlow, RollHistoryRecord, RollId, RollReport, SessionId};

/// Everything needed to continue an escalated roll.
#[derive(Debug, Clone)]
pub struct PendingEscalation {
    pub roll_id: RollId,
    /// Base roll, context as enriched by the ruleset
    pub report: RollReport,
    pub flow: EscalationFlow,
    /// Record submitted to the journal for the base roll
    pub record: RollHistoryRecord,
    pub created_at: DateTime<Utc>,
}

impl PendingEscalation {
    pub fn session_id(&self) -> SessionId {
        self.report.context.session_id
    }
}

#[derive(Default)]
pub struct PendingEscalationStore {
    inner: RwLock<HashMap<RollId, PendingEscalation>>,
}

impl PendingEscalationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, pending: PendingEscalation) {
        self.inner.write().await.insert(pending.roll_id, pending);
    }

    pub async fn get(&self, roll_id: RollId) -> Option<PendingEscalation> {
        self.inner.read().await.get(&roll_id).cloned()
    }

    /// Take the entry out; a second call for the same roll gets `None`.
    pub async fn remove(&self, roll_id: RollId) -> Option<PendingEscalation> {
        self.inner.write().await.remove(&roll_id)
    }

    pub async fn list_for_session(&self, session_id: SessionId) -> Vec<PendingEscalation> {
        self.inner
            .read()
            .await
            .values()
            .filter(|p| p.session_id() == session_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
