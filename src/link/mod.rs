//! Tracked links and the values exchanged while checking them.

pub mod kind;
pub mod service;
pub mod types;

pub use kind::{github_repository, stackoverflow_question_id, LinkKind};
pub use service::LinkService;
pub use types::{
    Link, NotificationRequest, TrackedResourceState, UpdateInfo, NO_UPDATES_SUMMARY,
};
