//! Per-link outcomes and the cycle summary.

use std::fmt;

use crate::error::UpdateError;

/// What happened to one link during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Changed, and the notifier confirmed delivery.
    Notified,
    /// Nothing changed.
    Unchanged,
    /// Changed, but no chat is subscribed any more.
    NoSubscribers,
    /// Changed, but the notification was not confirmed.
    DeliveryFailed,
    /// Detection failed for this link.
    Skipped(UpdateError),
    /// A store call failed before the link could be processed.
    StoreFailed,
}

/// Counters for one update cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Links in the batch.
    pub checked: usize,
    /// Links whose change notification was delivered.
    pub notified: usize,
    /// Links without a change.
    pub unchanged: usize,
    /// Changed links without subscribers.
    pub no_subscribers: usize,
    /// Changed links whose notification failed.
    pub delivery_failed: usize,
    /// Links skipped because their auxiliary state is missing.
    pub skipped_auxiliary_missing: usize,
    /// Links skipped because the source was unreachable.
    pub skipped_source_unavailable: usize,
    /// Links whose resource is gone upstream.
    pub skipped_not_found: usize,
    /// Store calls that failed, including failed timestamp commits.
    pub store_failures: usize,
}

impl CycleReport {
    /// Add one link's result.
    pub(crate) fn record(&mut self, outcome: &LinkOutcome, commit_failed: bool) {
        self.checked += 1;
        match outcome {
            LinkOutcome::Notified => self.notified += 1,
            LinkOutcome::Unchanged => self.unchanged += 1,
            LinkOutcome::NoSubscribers => self.no_subscribers += 1,
            LinkOutcome::DeliveryFailed => self.delivery_failed += 1,
            LinkOutcome::Skipped(UpdateError::AuxiliaryStateMissing(_)) => {
                self.skipped_auxiliary_missing += 1
            }
            LinkOutcome::Skipped(UpdateError::NotFound(_)) => self.skipped_not_found += 1,
            LinkOutcome::Skipped(_) => self.skipped_source_unavailable += 1,
            LinkOutcome::StoreFailed => self.store_failures += 1,
        }
        if commit_failed {
            self.store_failures += 1;
        }
    }

    /// Links skipped for any reason.
    pub fn skipped(&self) -> usize {
        self.skipped_auxiliary_missing + self.skipped_source_unavailable + self.skipped_not_found
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked={} notified={} unchanged={} no_subscribers={} delivery_failed={} skipped={} store_failures={}",
            self.checked,
            self.notified,
            self.unchanged,
            self.no_subscribers,
            self.delivery_failed,
            self.skipped(),
            self.store_failures
        )
    }
}
