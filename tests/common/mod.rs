//! Test helpers for update cycle tests.
//!
//! Provides an in-memory database harness, scripted detectors, a recording
//! notifier and a link store wrapper that counts and can fail calls.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use scrapper::datetime::storage_precision;
use scrapper::{
    AuxiliaryStateStore, ChangeDetector, ChatLinkRepository, Database, DetectorRegistry, Link,
    LinkKind, LinkRepository, LinkStore, LinkUpdater, NotificationRequest, Notifier,
    QuestionRepository, ScrapperError, SubscriptionStore, TrackedResourceState, UpdateError,
    UpdateInfo, UpdateResult, UpdaterSettings,
};

/// Repository URL used across tests.
pub const REPO_URL: &str = "https://github.com/rust-lang/rust";

/// Question URL used across tests.
pub const QUESTION_URL: &str = "https://stackoverflow.com/questions/42/how-to-borrow";

/// Unclassifiable URL used across tests.
pub const OTHER_URL: &str = "https://example.com/blog/post";

/// In-memory database with repositories.
pub struct Harness {
    pub db: Database,
    pub links: LinkRepository,
    pub chats: ChatLinkRepository,
    pub questions: QuestionRepository,
    pub link_store: Arc<CountingLinkStore>,
}

impl Harness {
    pub async fn new() -> Self {
        let db = Database::open_in_memory().await.unwrap();
        let links = LinkRepository::new(db.pool());
        Self {
            chats: ChatLinkRepository::new(db.pool()),
            questions: QuestionRepository::new(db.pool()),
            link_store: Arc::new(CountingLinkStore::new(links.clone())),
            links,
            db,
        }
    }

    /// Create a link last checked `age` ago, subscribed by `chat_ids`.
    pub async fn add_link(&self, url: &str, age: TimeDelta, chat_ids: &[i64]) -> Link {
        let at = storage_precision(Utc::now() - age);
        let link = self.links.create(url, at).await.unwrap();
        for &chat_id in chat_ids {
            self.chats.register_chat(chat_id).await.unwrap();
            self.chats.subscribe(chat_id, link.id).await.unwrap();
        }
        link
    }

    /// Seed the stored answer count of a question link.
    pub async fn seed_answers(&self, link_id: i64, answer_count: i64) {
        self.questions
            .save_auxiliary_state(link_id, &TrackedResourceState::Question { answer_count })
            .await
            .unwrap();
    }

    /// Reload a link.
    pub async fn reload(&self, link: &Link) -> Link {
        self.links.get_by_id(link.id).await.unwrap().unwrap()
    }

    /// Build an updater over this harness.
    pub fn updater(
        &self,
        detectors: DetectorRegistry,
        notifier: Arc<dyn Notifier>,
        settings: UpdaterSettings,
    ) -> LinkUpdater {
        LinkUpdater::new(
            self.link_store.clone(),
            Arc::new(self.chats.clone()),
            Arc::new(self.questions.clone()),
            detectors,
            notifier,
        )
        .with_settings(settings)
    }
}

/// Settings with a one-day threshold and a short timeout.
pub fn test_settings() -> UpdaterSettings {
    UpdaterSettings {
        request_timeout: Duration::from_millis(500),
        ..UpdaterSettings::default()
    }
}

type Script =
    dyn Fn(&Link, Option<&TrackedResourceState>) -> UpdateResult<UpdateInfo> + Send + Sync;

/// Detector answering from a closure and recording every call.
pub struct ScriptedDetector {
    kind: LinkKind,
    script: Box<Script>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(i64, Option<TrackedResourceState>)>>,
}

impl ScriptedDetector {
    pub fn new<F>(kind: LinkKind, script: F) -> Self
    where
        F: Fn(&Link, Option<&TrackedResourceState>) -> UpdateResult<UpdateInfo>
            + Send
            + Sync
            + 'static,
    {
        Self {
            kind,
            script: Box::new(script),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Detector that always reports a change observed now.
    pub fn always_changed(kind: LinkKind, summary: &'static str) -> Self {
        Self::new(kind, move |_, _| Ok(UpdateInfo::changed(Utc::now(), summary)))
    }

    /// Detector that reports a change observed at a fixed time.
    pub fn changed_at(kind: LinkKind, observed_at: DateTime<Utc>, summary: &'static str) -> Self {
        Self::new(kind, move |link, _| {
            if observed_at > link.updated_at {
                Ok(UpdateInfo::changed(observed_at, summary))
            } else {
                Ok(UpdateInfo::unchanged(link))
            }
        })
    }

    /// Detector that never reports a change.
    pub fn unchanged(kind: LinkKind) -> Self {
        Self::new(kind, |link, _| Ok(UpdateInfo::unchanged(link)))
    }

    /// Detector that always fails.
    pub fn failing(kind: LinkKind, err: UpdateError) -> Self {
        Self::new(kind, move |_, _| Err(err.clone()))
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Link ids this detector was called with, in call order.
    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    /// States this detector received.
    pub fn states(&self) -> Vec<Option<TrackedResourceState>> {
        self.calls.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }
}

#[async_trait]
impl ChangeDetector for ScriptedDetector {
    fn kind(&self) -> LinkKind {
        self.kind
    }

    async fn detect(
        &self,
        link: &Link,
        state: Option<&TrackedResourceState>,
    ) -> UpdateResult<UpdateInfo> {
        self.calls.lock().unwrap().push((link.id, state.copied()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(link, state)
    }
}

/// Registry with the given detectors.
pub fn registry(detectors: &[Arc<ScriptedDetector>]) -> DetectorRegistry {
    let mut registry = DetectorRegistry::new();
    for detector in detectors {
        registry.register(detector.clone());
    }
    registry
}

/// Notifier that records requests and can fail on demand.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotificationRequest>>,
    attempts: AtomicUsize,
    fail_links: Mutex<HashSet<i64>>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request for `link_id`.
    pub fn fail_for(self, link_id: i64) -> Self {
        self.fail_links.lock().unwrap().insert(link_id);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Successfully delivered requests.
    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// All send attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, request: &NotificationRequest) -> UpdateResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_links.lock().unwrap().contains(&request.link_id) {
            return Err(UpdateError::DeliveryFailed("bot unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Link store that counts calls and can fail commits for chosen links.
pub struct CountingLinkStore {
    inner: LinkRepository,
    lists: AtomicUsize,
    commits: AtomicUsize,
    fail_commits: Mutex<HashSet<i64>>,
}

impl CountingLinkStore {
    pub fn new(inner: LinkRepository) -> Self {
        Self {
            inner,
            lists: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            fail_commits: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_commit_for(&self, link_id: i64) {
        self.fail_commits.lock().unwrap().insert(link_id);
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkStore for CountingLinkStore {
    async fn list_stale_links(&self, threshold: TimeDelta) -> scrapper::Result<Vec<Link>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_stale_links(threshold).await
    }

    async fn update_timestamps(
        &self,
        link_id: i64,
        updated_at: DateTime<Utc>,
        last_checked_at: DateTime<Utc>,
    ) -> scrapper::Result<bool> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.lock().unwrap().contains(&link_id) {
            return Err(ScrapperError::Database("disk I/O error".to_string()));
        }
        self.inner
            .update_timestamps(link_id, updated_at, last_checked_at)
            .await
    }

    async fn mark_unavailable(&self, link_id: i64, reason: &str) -> scrapper::Result<()> {
        self.inner.mark_unavailable(link_id, reason).await
    }

    async fn clear_unavailable(&self, link_id: i64) -> scrapper::Result<()> {
        self.inner.clear_unavailable(link_id).await
    }
}

/// Subscription store that always fails.
pub struct BrokenSubscriptions;

#[async_trait]
impl SubscriptionStore for BrokenSubscriptions {
    async fn list_subscriber_chat_ids(&self, _link_id: i64) -> scrapper::Result<BTreeSet<i64>> {
        Err(ScrapperError::Database("database is locked".to_string()))
    }
}
