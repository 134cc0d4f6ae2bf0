//! Link data model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::link::kind::LinkKind;

/// Summary used when nothing changed.
pub const NO_UPDATES_SUMMARY: &str = "No updates";

/// A tracked link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link ID.
    pub id: i64,
    /// Tracked URL.
    pub url: String,
    /// Time of the last detected remote change.
    pub updated_at: DateTime<Utc>,
    /// Time of the last poll. Never earlier than `updated_at`.
    pub last_checked_at: DateTime<Utc>,
    /// When the link was first tracked.
    pub created_at: DateTime<Utc>,
    /// Set while the resource is reported gone upstream.
    pub unavailable_since: Option<DateTime<Utc>>,
    /// Last per-link failure message.
    pub last_error: Option<String>,
}

impl Link {
    /// Classify this link's URL.
    pub fn kind(&self) -> LinkKind {
        LinkKind::classify(&self.url)
    }
}

/// Kind-specific state needed to describe or detect a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedResourceState {
    /// Stack Overflow question state.
    Question {
        /// Number of answers seen at the previous check.
        answer_count: i64,
    },
}

impl TrackedResourceState {
    /// Prior answer count, if this is question state.
    pub fn answer_count(&self) -> Option<i64> {
        match self {
            TrackedResourceState::Question { answer_count } => Some(*answer_count),
        }
    }
}

/// Result of a detection attempt for one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    /// Whether the remote resource changed since `link.updated_at`.
    pub changed: bool,
    /// Remote change time when changed, otherwise `link.updated_at`.
    pub observed_at: DateTime<Utc>,
    /// Human-readable change summary.
    pub summary: String,
    /// Kind-specific state to store once the check is committed.
    pub next_state: Option<TrackedResourceState>,
}

impl UpdateInfo {
    /// A detected change.
    pub fn changed(observed_at: DateTime<Utc>, summary: impl Into<String>) -> Self {
        Self {
            changed: true,
            observed_at,
            summary: summary.into(),
            next_state: None,
        }
    }

    /// Attach the state that replaces the stored one when this check is
    /// committed.
    pub fn with_next_state(mut self, state: TrackedResourceState) -> Self {
        self.next_state = Some(state);
        self
    }

    /// No change; carries the link's current `updated_at` forward.
    pub fn unchanged(link: &Link) -> Self {
        Self {
            changed: false,
            observed_at: link.updated_at,
            summary: NO_UPDATES_SUMMARY.to_string(),
            next_state: None,
        }
    }

    /// Check the timestamp guarantees against the link that was checked.
    ///
    /// `changed` requires a strictly newer `observed_at`; unchanged requires
    /// `observed_at == link.updated_at`.
    pub fn is_consistent_with(&self, link: &Link) -> bool {
        if self.changed {
            self.observed_at > link.updated_at
        } else {
            self.observed_at == link.updated_at
        }
    }
}

/// One change notification for every chat subscribed to a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    /// Link ID.
    #[serde(rename = "id")]
    pub link_id: i64,
    /// Link URL.
    pub url: String,
    /// Change summary.
    #[serde(rename = "description")]
    pub summary: String,
    /// Recipients.
    #[serde(rename = "tgChatIds")]
    pub chat_ids: BTreeSet<i64>,
}

impl NotificationRequest {
    /// Build a request for a changed link.
    pub fn new(link: &Link, summary: impl Into<String>, chat_ids: BTreeSet<i64>) -> Self {
        Self {
            link_id: link.id,
            url: link.url.clone(),
            summary: summary.into(),
            chat_ids,
        }
    }
}
