//! Link update orchestration.
//!
//! One cycle lists the stale links, asks the matching detector about each of
//! them, fans a notification out to the subscribers of every changed link and
//! commits the new timestamps. Links are processed independently with bounded
//! concurrency; a failing link never affects the others.

mod report;
mod scheduler;

pub use report::{CycleReport, LinkOutcome};
pub use scheduler::{start_link_updater, UpdaterScheduler};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::{SourceFailurePolicy, UpdaterConfig};
use crate::datetime::storage_precision;
use crate::db::{AuxiliaryStateStore, LinkStore, SubscriptionStore};
use crate::detector::DetectorRegistry;
use crate::error::UpdateError;
use crate::link::{Link, NotificationRequest, TrackedResourceState, UpdateInfo};
use crate::notifier::Notifier;
use crate::Result;

/// Tuning for the update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdaterSettings {
    /// A link is stale once last checked longer ago than this.
    pub stale_threshold: TimeDelta,
    /// Links checked at the same time.
    pub max_concurrent_checks: usize,
    /// Bound for every detector and notifier call.
    pub request_timeout: Duration,
    /// Timestamp policy for unreachable sources.
    pub source_failure_policy: SourceFailurePolicy,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self::from(&UpdaterConfig::default())
    }
}

impl From<&UpdaterConfig> for UpdaterSettings {
    fn from(config: &UpdaterConfig) -> Self {
        let threshold_secs = i64::try_from(config.stale_threshold_secs).unwrap_or(i64::MAX);
        Self {
            stale_threshold: TimeDelta::try_seconds(threshold_secs).unwrap_or(TimeDelta::MAX),
            max_concurrent_checks: config.max_concurrent_checks.max(1),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            source_failure_policy: config.source_failure_policy,
        }
    }
}

/// Result of checking one link.
struct LinkCheck {
    outcome: LinkOutcome,
    commit_failed: bool,
}

impl LinkCheck {
    fn new(outcome: LinkOutcome) -> Self {
        Self {
            outcome,
            commit_failed: false,
        }
    }
}

/// The update orchestrator.
pub struct LinkUpdater {
    links: Arc<dyn LinkStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    states: Arc<dyn AuxiliaryStateStore>,
    detectors: DetectorRegistry,
    notifier: Arc<dyn Notifier>,
    settings: UpdaterSettings,
    cycle_lock: Mutex<()>,
}

impl LinkUpdater {
    /// Create an updater with default settings.
    pub fn new(
        links: Arc<dyn LinkStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        states: Arc<dyn AuxiliaryStateStore>,
        detectors: DetectorRegistry,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            links,
            subscriptions,
            states,
            detectors,
            notifier,
            settings: UpdaterSettings::default(),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: UpdaterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &UpdaterSettings {
        &self.settings
    }

    /// Run one cycle and return the number of links whose change
    /// notification was delivered.
    pub async fn run_update_cycle(&self) -> Result<usize> {
        Ok(self.run_update_cycle_report().await?.notified)
    }

    /// Run one cycle and return the full report.
    ///
    /// Only listing the batch can fail the cycle; per-link failures are
    /// logged and counted. Concurrent callers are serialized.
    pub async fn run_update_cycle_report(&self) -> Result<CycleReport> {
        let _cycle = self.cycle_lock.lock().await;

        let links = self
            .links
            .list_stale_links(self.settings.stale_threshold)
            .await?;

        let mut report = CycleReport::default();
        if links.is_empty() {
            debug!("No stale links");
            return Ok(report);
        }

        info!("Checking {} stale link(s)", links.len());

        let checks: Vec<LinkCheck> = stream::iter(links)
            .map(|link| self.check_link(link))
            .buffer_unordered(self.settings.max_concurrent_checks.max(1))
            .collect()
            .await;

        for check in &checks {
            report.record(&check.outcome, check.commit_failed);
        }

        info!("Update cycle finished: {}", report);
        Ok(report)
    }

    async fn check_link(&self, link: Link) -> LinkCheck {
        let kind = link.kind();
        debug!("Checking link {} ({}) as {}", link.id, link.url, kind);

        let state = if kind.requires_state() {
            match self.load_state(&link).await {
                Ok(state) => Some(state),
                Err(check) => return check,
            }
        } else {
            None
        };

        let detector = self.detectors.resolve(kind);
        let detected = match timeout(
            self.settings.request_timeout,
            detector.detect(&link, state.as_ref()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(UpdateError::SourceUnavailable(format!(
                "detector timed out after {}s",
                self.settings.request_timeout.as_secs()
            ))),
        };

        // Compare at the precision that is stored, or a sub-microsecond
        // change would be notified without moving `updated_at`.
        let detected = detected.map(|info| UpdateInfo {
            observed_at: storage_precision(info.observed_at),
            ..info
        });

        let info = match detected {
            Ok(info) if info.is_consistent_with(&link) => info,
            Ok(info) => {
                warn!(
                    "Detector returned inconsistent timestamp for link {} ({}): changed={} observed_at={}; treating as unchanged",
                    link.id, link.url, info.changed, info.observed_at
                );
                UpdateInfo::unchanged(&link)
            }
            Err(e) => return self.handle_detect_error(&link, e).await,
        };

        let outcome = if info.changed {
            match self.notify(&link, &info).await {
                Some(outcome) => outcome,
                None => return LinkCheck::new(LinkOutcome::StoreFailed),
            }
        } else {
            LinkOutcome::Unchanged
        };

        let commit_failed = !self
            .commit(&link, info.observed_at, info.next_state.as_ref())
            .await;
        if !commit_failed && link.unavailable_since.is_some() {
            if let Err(e) = self.links.clear_unavailable(link.id).await {
                error!("Failed to clear unavailable flag for link {}: {}", link.id, e);
            }
        }

        LinkCheck {
            outcome,
            commit_failed,
        }
    }

    async fn load_state(&self, link: &Link) -> std::result::Result<TrackedResourceState, LinkCheck> {
        match self.states.get_auxiliary_state(link.id).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => {
                error!(
                    "Auxiliary state missing for link {} ({}); skipping",
                    link.id, link.url
                );
                Err(LinkCheck::new(LinkOutcome::Skipped(
                    UpdateError::AuxiliaryStateMissing(link.id),
                )))
            }
            Err(e) => {
                error!("Failed to load state for link {}: {}", link.id, e);
                Err(LinkCheck::new(LinkOutcome::StoreFailed))
            }
        }
    }

    async fn handle_detect_error(&self, link: &Link, err: UpdateError) -> LinkCheck {
        let advance = match &err {
            UpdateError::AuxiliaryStateMissing(_) => {
                error!("Link {} ({}) skipped: {}", link.id, link.url, err);
                false
            }
            UpdateError::NotFound(reason) => {
                warn!("Link {} ({}) is gone upstream: {}", link.id, link.url, reason);
                if let Err(e) = self.links.mark_unavailable(link.id, &err.to_string()).await {
                    error!("Failed to flag link {}: {}", link.id, e);
                }
                true
            }
            UpdateError::SourceUnavailable(_) | UpdateError::DeliveryFailed(_) => {
                warn!("Link {} ({}) skipped: {}", link.id, link.url, err);
                self.settings.source_failure_policy == SourceFailurePolicy::Advance
            }
        };

        let commit_failed = advance && !self.commit(link, link.updated_at, None).await;
        LinkCheck {
            outcome: LinkOutcome::Skipped(err),
            commit_failed,
        }
    }

    /// Send the change to the current subscribers.
    ///
    /// Returns `None` when the subscribers could not be listed; the link is
    /// then left for the next cycle.
    async fn notify(&self, link: &Link, info: &UpdateInfo) -> Option<LinkOutcome> {
        let chat_ids = match self.subscriptions.list_subscriber_chat_ids(link.id).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to list subscribers of link {}: {}", link.id, e);
                return None;
            }
        };

        if chat_ids.is_empty() {
            debug!("Link {} changed but has no subscribers", link.id);
            return Some(LinkOutcome::NoSubscribers);
        }

        let request = NotificationRequest::new(link, info.summary.as_str(), chat_ids);
        let sent = match timeout(self.settings.request_timeout, self.notifier.send(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(UpdateError::DeliveryFailed(format!(
                "notifier timed out after {}s",
                self.settings.request_timeout.as_secs()
            ))),
        };

        match sent {
            Ok(()) => {
                info!(
                    "Link {} ({}) changed: {}; notified {} chat(s)",
                    link.id,
                    link.url,
                    info.summary,
                    request.chat_ids.len()
                );
                Some(LinkOutcome::Notified)
            }
            Err(e) => {
                warn!("Link {} ({}): {}", link.id, link.url, e);
                Some(LinkOutcome::DeliveryFailed)
            }
        }
    }

    /// Persist the check. Returns `false` if a store call failed.
    ///
    /// `next_state` is written only after the timestamps, so a check that is
    /// not committed leaves the previous state for the retry.
    async fn commit(
        &self,
        link: &Link,
        observed_at: DateTime<Utc>,
        next_state: Option<&TrackedResourceState>,
    ) -> bool {
        let updated_at = storage_precision(observed_at);
        let checked_at = next_checked_at(link, updated_at, Utc::now());

        match self
            .links
            .update_timestamps(link.id, updated_at, checked_at)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!("Link {} was checked more recently; write discarded", link.id);
                return true;
            }
            Err(e) => {
                error!("Failed to commit timestamps for link {}: {}", link.id, e);
                return false;
            }
        }

        let Some(state) = next_state else {
            return true;
        };
        match self.states.save_auxiliary_state(link.id, state).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save state for link {} ({}): {}", link.id, link.url, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for LinkUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkUpdater")
            .field("detectors", &self.detectors)
            .field("settings", &self.settings)
            .finish()
    }
}

/// New `last_checked_at`: never before `updated_at` and strictly after the
/// previous check.
fn next_checked_at(link: &Link, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = link.last_checked_at + TimeDelta::microseconds(1);
    storage_precision(now).max(updated_at).max(floor)
}
