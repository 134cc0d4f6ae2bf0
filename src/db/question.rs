//! Question state repository.

use async_trait::async_trait;
use chrono::Utc;

use super::traits::AuxiliaryStateStore;
use super::DbPool;
use crate::datetime::to_db;
use crate::link::TrackedResourceState;
use crate::Result;

/// Repository for Stack Overflow question state.
#[derive(Clone)]
pub struct QuestionRepository {
    pool: DbPool,
}

impl QuestionRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Get the stored answer count for a link.
    pub async fn get_answer_count(&self, link_id: i64) -> Result<Option<i64>> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT answer_count FROM questions WHERE link_id = ?")
                .bind(link_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(count)
    }

    /// Insert or replace the answer count for a link.
    pub async fn upsert(&self, link_id: i64, answer_count: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO questions (link_id, answer_count, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(link_id) DO UPDATE SET answer_count = ?2, updated_at = ?3",
        )
        .bind(link_id)
        .bind(answer_count)
        .bind(to_db(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AuxiliaryStateStore for QuestionRepository {
    async fn get_auxiliary_state(&self, link_id: i64) -> Result<Option<TrackedResourceState>> {
        Ok(self
            .get_answer_count(link_id)
            .await?
            .map(|answer_count| TrackedResourceState::Question { answer_count }))
    }

    async fn save_auxiliary_state(
        &self,
        link_id: i64,
        state: &TrackedResourceState,
    ) -> Result<()> {
        match state {
            TrackedResourceState::Question { answer_count } => {
                self.upsert(link_id, *answer_count).await
            }
        }
    }
}
