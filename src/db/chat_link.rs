//! Chat and subscription repository.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;

use super::link::{fetch_links, link_columns_with_alias};
use super::traits::SubscriptionStore;
use super::DbPool;
use crate::datetime::to_db;
use crate::link::Link;
use crate::Result;

/// Repository for chats and their link subscriptions.
#[derive(Clone)]
pub struct ChatLinkRepository {
    pool: DbPool,
}

impl ChatLinkRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Register a chat. Returns `false` if it was already registered.
    pub async fn register_chat(&self, chat_id: i64) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO chats (id, created_at) VALUES (?, ?)")
            .bind(chat_id)
            .bind(to_db(&Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a chat together with its subscriptions.
    pub async fn remove_chat(&self, chat_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check whether a chat is registered.
    pub async fn chat_exists(&self, chat_id: i64) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM chats WHERE id = ?)")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }

    /// Subscribe a chat to a link. Returns `false` if already subscribed.
    pub async fn subscribe(&self, chat_id: i64, link_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO chat_links (chat_id, link_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(chat_id)
        .bind(link_id)
        .bind(to_db(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Unsubscribe a chat from a link.
    pub async fn unsubscribe(&self, chat_id: i64, link_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chat_links WHERE chat_id = ? AND link_id = ?")
            .bind(chat_id)
            .bind(link_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count chats subscribed to a link.
    pub async fn count_subscribers(&self, link_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_links WHERE link_id = ?")
            .bind(link_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// List the links a chat is subscribed to, ordered by link ID.
    pub async fn list_links_by_chat(&self, chat_id: i64) -> Result<Vec<Link>> {
        let sql = format!(
            "SELECT {} FROM links l
             JOIN chat_links cl ON cl.link_id = l.id
             WHERE cl.chat_id = ?
             ORDER BY l.id",
            link_columns_with_alias()
        );
        fetch_links(&self.pool, &sql, Some(chat_id)).await
    }
}

#[async_trait]
impl SubscriptionStore for ChatLinkRepository {
    async fn list_subscriber_chat_ids(&self, link_id: i64) -> Result<BTreeSet<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT chat_id FROM chat_links WHERE link_id = ?")
            .bind(link_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }
}
