//! Notification delivery contract.

use async_trait::async_trait;

use crate::error::UpdateResult;
use crate::link::NotificationRequest;

/// Delivers a change summary to a set of chats.
///
/// A successful return means the receiver confirmed the request; anything
/// else is reported as `UpdateError::DeliveryFailed`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification.
    async fn send(&self, request: &NotificationRequest) -> UpdateResult<()>;
}
