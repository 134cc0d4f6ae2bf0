//! Store contracts consumed by the link updater.
//!
//! The updater only depends on these traits; the SQLite repositories in
//! this module are one implementation. All methods are keyed by link id, so
//! implementations must tolerate concurrent calls for distinct links.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::link::{Link, TrackedResourceState};
use crate::Result;

/// Persisted set of tracked links.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// List links whose `last_checked_at` is older than `now - threshold`,
    /// oldest first.
    async fn list_stale_links(&self, threshold: Duration) -> Result<Vec<Link>>;

    /// Record the result of a check.
    ///
    /// `updated_at` never moves backwards and `last_checked_at` only moves
    /// strictly forwards. Returns `false` when the write was discarded
    /// because a newer check was already recorded.
    async fn update_timestamps(
        &self,
        link_id: i64,
        updated_at: DateTime<Utc>,
        last_checked_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Flag a link whose resource is gone upstream.
    async fn mark_unavailable(&self, link_id: i64, reason: &str) -> Result<()>;

    /// Clear the unavailable flag after a successful check.
    async fn clear_unavailable(&self, link_id: i64) -> Result<()>;
}

/// Link to chat subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// All chats currently subscribed to a link.
    async fn list_subscriber_chat_ids(&self, link_id: i64) -> Result<BTreeSet<i64>>;
}

/// Kind-specific state kept next to a link.
#[async_trait]
pub trait AuxiliaryStateStore: Send + Sync {
    /// Stored state for a link, `None` if absent.
    async fn get_auxiliary_state(&self, link_id: i64) -> Result<Option<TrackedResourceState>>;

    /// Replace the stored state for a link.
    async fn save_auxiliary_state(&self, link_id: i64, state: &TrackedResourceState)
        -> Result<()>;
}
