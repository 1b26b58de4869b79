//! SQLite-backed roll history.
//!
//! One row per roll. The full record (serialized result plus the flattened
//! legacy shape) lives in `record_json`; ids, notation and timestamp are
//! duplicated into columns for lookups.

use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{Row, SqlitePool};
use vttdice_domain::{RollHistoryRecord, RollId, SessionId};

use crate::infrastructure::ports::{RepoError, RollHistoryRepo};

/// SQLite implementation of roll history storage.
pub struct SqliteRollHistoryRepo {
    pool: SqlitePool,
}

impl SqliteRollHistoryRepo {
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("roll_history", e))?;

        Self::from_pool(pool).await
    }

    /// Use an existing pool, creating the table if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, RepoError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roll_history (
                roll_id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                character_id TEXT NOT NULL,
                notation TEXT NOT NULL,
                record_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("roll_history", e))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_roll_history_session
            ON roll_history(session_id, created_at)
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("roll_history", e))?;

        Ok(Self { pool })
    }

    fn decode(json: &str) -> Result<RollHistoryRecord, RepoError> {
        serde_json::from_str(json).map_err(RepoError::serialization)
    }
}

#[async_trait]
impl RollHistoryRepo for SqliteRollHistoryRepo {
    async fn save(&self, record: &RollHistoryRecord) -> Result<(), RepoError> {
        let json = serde_json::to_string(record).map_err(RepoError::serialization)?;
        let created_at = record
            .created_at
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            r#"
            INSERT INTO roll_history (roll_id, session_id, character_id, notation, record_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(roll_id) DO UPDATE SET
                notation = excluded.notation,
                record_json = excluded.record_json
            "#,
        )
        .bind(record.roll_id.to_string())
        .bind(record.session_id.to_string())
        .bind(record.character_id.to_string())
        .bind(&record.notation)
        .bind(json)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("roll_history_save", e))?;

        Ok(())
    }

    async fn get(&self, roll_id: RollId) -> Result<Option<RollHistoryRecord>, RepoError> {
        let row = sqlx::query("SELECT record_json FROM roll_history WHERE roll_id = ?")
            .bind(roll_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("roll_history_get", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("record_json");
                Ok(Some(Self::decode(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_session(
        &self,
        session_id: SessionId,
        limit: Option<u32>,
    ) -> Result<Vec<RollHistoryRecord>, RepoError> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(i64::from).unwrap_or(-1);

        let rows = sqlx::query(
            r#"
            SELECT record_json
            FROM roll_history
            WHERE session_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(session_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("roll_history_list", e))?;

        rows.iter()
            .map(|row| {
                let json: String = row.get("record_json");
                Self::decode(&json)
            })
            .collect()
    }
}
