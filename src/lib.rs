//! Scrapper - link update detection and notification
//!
//! Periodically checks tracked GitHub repositories and Stack Overflow
//! questions for changes and notifies every subscribed chat through the bot.

pub mod client;
pub mod config;
pub mod datetime;
pub mod db;
pub mod detector;
pub mod error;
pub mod link;
pub mod logging;
pub mod notifier;
pub mod updater;

pub use client::{build_http_client, BotClient, GitHubClient, StackOverflowClient};
pub use config::{Config, SourceFailurePolicy};
pub use db::{
    AuxiliaryStateStore, ChatLinkRepository, Database, LinkRepository, LinkStore,
    QuestionRepository, SubscriptionStore,
};
pub use detector::{ChangeDetector, DetectorRegistry, UnknownDetector};
pub use error::{Result, ScrapperError, UpdateError, UpdateResult};
pub use link::{
    Link, LinkKind, LinkService, NotificationRequest, TrackedResourceState, UpdateInfo,
    NO_UPDATES_SUMMARY,
};
pub use notifier::Notifier;
pub use updater::{
    start_link_updater, CycleReport, LinkOutcome, LinkUpdater, UpdaterScheduler, UpdaterSettings,
};
