//! Bot notification client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::join_url;
use crate::config::BotConfig;
use crate::error::{UpdateError, UpdateResult};
use crate::link::NotificationRequest;
use crate::notifier::Notifier;

/// Posts change notifications to the bot's `/updates` endpoint.
#[derive(Debug, Clone)]
pub struct BotClient {
    client: Client,
    updates_url: String,
}

impl BotClient {
    /// Create a client.
    pub fn new(client: Client, config: &BotConfig) -> Self {
        Self {
            client,
            updates_url: join_url(&config.url, "updates"),
        }
    }

    /// Endpoint notifications are posted to.
    pub fn updates_url(&self) -> &str {
        &self.updates_url
    }
}

#[async_trait]
impl Notifier for BotClient {
    async fn send(&self, request: &NotificationRequest) -> UpdateResult<()> {
        debug!(
            "Posting update for link {} to {} chat(s)",
            request.link_id,
            request.chat_ids.len()
        );

        let response = self
            .client
            .post(&self.updates_url)
            .json(request)
            .send()
            .await
            .map_err(|e| UpdateError::DeliveryFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DeliveryFailed(format!(
                "bot answered HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}
