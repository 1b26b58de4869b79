//! Repository port traits for roll history and spendable resources.

use async_trait::async_trait;
use vttdice_domain::{CharacterId, RollHistoryRecord, RollId, SessionId};

use super::error::RepoError;

// =============================================================================
// Roll History
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RollHistoryRepo: Send + Sync {
    /// Insert or replace the record with the same roll id.
    async fn save(&self, record: &RollHistoryRecord) -> Result<(), RepoError>;
    async fn get(&self, roll_id: RollId) -> Result<Option<RollHistoryRecord>, RepoError>;
    /// Newest first.
    async fn list_for_session(
        &self,
        session_id: SessionId,
        limit: Option<u32>,
    ) -> Result<Vec<RollHistoryRecord>, RepoError>;
}

// =============================================================================
// Spendable Resources
// =============================================================================

/// Caller-owned spendable counter (saga points) per character.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceRepo: Send + Sync {
    /// Current balance; unknown characters hold zero.
    async fn get(&self, character_id: CharacterId) -> Result<u32, RepoError>;
    async fn set(&self, character_id: CharacterId, amount: u32) -> Result<(), RepoError>;
    /// Apply `delta` as one atomic update and return the new balance.
    ///
    /// Fails without changing anything when the balance would go negative.
    async fn adjust(&self, character_id: CharacterId, delta: i64) -> Result<u32, RepoError>;
}
