//! Change detection contract and the kind-to-detector table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::UpdateResult;
use crate::link::{Link, LinkKind, TrackedResourceState, UpdateInfo};

/// Asks an external source whether a tracked resource changed.
///
/// Implementations must only report `changed` with an `observed_at` strictly
/// newer than `link.updated_at`, and must return `link.updated_at` unchanged
/// otherwise.
#[async_trait]
pub trait ChangeDetector: Send + Sync {
    /// The link kind this detector handles.
    fn kind(&self) -> LinkKind;

    /// Check one link.
    ///
    /// `state` is the stored auxiliary state for kinds that need it. Callers
    /// resolve a missing state before calling, so detectors may treat `None`
    /// as a data-integrity error.
    async fn detect(
        &self,
        link: &Link,
        state: Option<&TrackedResourceState>,
    ) -> UpdateResult<UpdateInfo>;
}

/// Detector for links that no source understands.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownDetector;

#[async_trait]
impl ChangeDetector for UnknownDetector {
    fn kind(&self) -> LinkKind {
        LinkKind::Unknown
    }

    async fn detect(
        &self,
        link: &Link,
        _state: Option<&TrackedResourceState>,
    ) -> UpdateResult<UpdateInfo> {
        Ok(UpdateInfo::unchanged(link))
    }
}

/// Mapping from link kind to its detector.
#[derive(Clone)]
pub struct DetectorRegistry {
    detectors: HashMap<LinkKind, Arc<dyn ChangeDetector>>,
    fallback: Arc<dyn ChangeDetector>,
}

impl DetectorRegistry {
    /// Create a registry that only knows the built-in unknown detector.
    pub fn new() -> Self {
        Self {
            detectors: HashMap::new(),
            fallback: Arc::new(UnknownDetector),
        }
    }

    /// Register a detector under its own kind, replacing any previous one.
    pub fn register(&mut self, detector: Arc<dyn ChangeDetector>) -> &mut Self {
        self.detectors.insert(detector.kind(), detector);
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, detector: Arc<dyn ChangeDetector>) -> Self {
        self.register(detector);
        self
    }

    /// Detector for a kind. Unregistered kinds get the unknown detector.
    pub fn resolve(&self, kind: LinkKind) -> Arc<dyn ChangeDetector> {
        self.detectors
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Whether a dedicated detector is registered for `kind`.
    pub fn contains(&self, kind: LinkKind) -> bool {
        self.detectors.contains_key(&kind)
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<LinkKind> = self.detectors.keys().copied().collect();
        kinds.sort();
        f.debug_struct("DetectorRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
