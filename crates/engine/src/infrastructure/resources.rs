//! In-process spendable resource balances.
//!
//! Stands in for the character store in single-process deployments and
//! tests. `adjust` holds the map shard lock for the read-modify-write so
//! concurrent spends on the same character never interleave.

use async_trait::async_trait;
use dashmap::DashMap;
use vttdice_domain::CharacterId;

use crate::infrastructure::ports::{RepoError, ResourceRepo};

#[derive(Default)]
pub struct InMemoryResourceRepo {
    balances: DashMap<CharacterId, u32>,
}

impl InMemoryResourceRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed balances, e.g. from a session file.
    pub fn with_balances(balances: impl IntoIterator<Item = (CharacterId, u32)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceRepo for InMemoryResourceRepo {
    async fn get(&self, character_id: CharacterId) -> Result<u32, RepoError> {
        Ok(self
            .balances
            .get(&character_id)
            .map(|entry| *entry)
            .unwrap_or(0))
    }

    async fn set(&self, character_id: CharacterId, amount: u32) -> Result<(), RepoError> {
        self.balances.insert(character_id, amount);
        Ok(())
    }

    async fn adjust(&self, character_id: CharacterId, delta: i64) -> Result<u32, RepoError> {
        let mut entry = self.balances.entry(character_id).or_insert(0);
        let current = *entry;
        let next = i64::from(current) + delta;

        if next < 0 {
            return Err(RepoError::Insufficient {
                requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
                available: current,
            });
        }

        let next = u32::try_from(next).map_err(|_| {
            RepoError::constraint(format!("balance of {} overflows", character_id))
        })?;
        *entry = next;

        tracing::debug!(
            character_id = %character_id,
            delta,
            balance = next,
            "Adjusted resource balance"
        );
        Ok(next)
    }
}
