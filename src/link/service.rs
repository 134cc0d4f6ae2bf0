//! Subscription management for chats.
//!
//! Creates links on first subscription and removes them once the last chat
//! stops tracking them. The updater never creates or deletes links itself.

use chrono::Utc;
use tracing::{debug, info, warn};
use url::Url;

use crate::db::{AuxiliaryStateStore, ChatLinkRepository, Database, LinkRepository, QuestionRepository};
use crate::link::{Link, TrackedResourceState};
use crate::{Result, ScrapperError};

/// Service for chat and subscription operations.
pub struct LinkService<'a> {
    db: &'a Database,
}

impl<'a> LinkService<'a> {
    /// Create a new LinkService with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a chat. Returns `false` if it already existed.
    pub async fn register_chat(&self, chat_id: i64) -> Result<bool> {
        let registered = ChatLinkRepository::new(self.db.pool())
            .register_chat(chat_id)
            .await?;
        if registered {
            info!("Chat {} registered", chat_id);
        }
        Ok(registered)
    }

    /// Remove a chat and every link only it was tracking.
    pub async fn remove_chat(&self, chat_id: i64) -> Result<()> {
        let chats = ChatLinkRepository::new(self.db.pool());
        let tracked = chats.list_links_by_chat(chat_id).await?;

        if !chats.remove_chat(chat_id).await? {
            return Err(ScrapperError::NotFound(format!("chat {}", chat_id)));
        }

        for link in tracked {
            self.delete_if_orphaned(&chats, &link).await?;
        }

        info!("Chat {} removed", chat_id);
        Ok(())
    }

    /// Start tracking a URL for a chat.
    ///
    /// The link is created on first subscription with both timestamps set to
    /// now. `initial_state` seeds the auxiliary state of a new question link.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is not an absolute http(s) URL
    /// - The chat is not registered
    /// - The chat already tracks the URL
    pub async fn track(
        &self,
        chat_id: i64,
        url: &str,
        initial_state: Option<TrackedResourceState>,
    ) -> Result<Link> {
        let url = validate_link_url(url)?;

        let chats = ChatLinkRepository::new(self.db.pool());
        if !chats.chat_exists(chat_id).await? {
            return Err(ScrapperError::NotFound(format!("chat {}", chat_id)));
        }

        let links = LinkRepository::new(self.db.pool());
        let link = match links.get_by_url(&url).await? {
            Some(link) => link,
            None => {
                let link = links.create(&url, Utc::now()).await?;
                debug!("Created link {} for {}", link.id, url);
                link
            }
        };

        if !chats.subscribe(chat_id, link.id).await? {
            return Err(ScrapperError::Validation(format!(
                "chat {} already tracks {}",
                chat_id, url
            )));
        }

        let states = QuestionRepository::new(self.db.pool());
        let has_state = states.get_auxiliary_state(link.id).await?.is_some();
        match initial_state {
            Some(state) if !has_state => states.save_auxiliary_state(link.id, &state).await?,
            None if !has_state && link.kind().requires_state() => {
                warn!(
                    "Link {} ({}) tracked without {} state; it will be skipped until seeded",
                    link.id,
                    link.url,
                    link.kind()
                );
            }
            _ => {}
        }

        info!("Chat {} now tracks {}", chat_id, url);
        Ok(link)
    }

    /// Stop tracking a URL for a chat. Returns the untracked link.
    pub async fn untrack(&self, chat_id: i64, url: &str) -> Result<Link> {
        let url = validate_link_url(url)?;

        let link = LinkRepository::new(self.db.pool())
            .get_by_url(&url)
            .await?
            .ok_or_else(|| ScrapperError::NotFound(format!("link {}", url)))?;

        let chats = ChatLinkRepository::new(self.db.pool());
        if !chats.unsubscribe(chat_id, link.id).await? {
            return Err(ScrapperError::NotFound(format!(
                "subscription of chat {} to {}",
                chat_id, url
            )));
        }

        self.delete_if_orphaned(&chats, &link).await?;

        info!("Chat {} no longer tracks {}", chat_id, url);
        Ok(link)
    }

    /// List the links a chat tracks.
    pub async fn list_tracked(&self, chat_id: i64) -> Result<Vec<Link>> {
        let chats = ChatLinkRepository::new(self.db.pool());
        if !chats.chat_exists(chat_id).await? {
            return Err(ScrapperError::NotFound(format!("chat {}", chat_id)));
        }
        chats.list_links_by_chat(chat_id).await
    }

    async fn delete_if_orphaned(&self, chats: &ChatLinkRepository, link: &Link) -> Result<()> {
        if chats.count_subscribers(link.id).await? == 0 {
            LinkRepository::new(self.db.pool()).delete(link.id).await?;
            debug!("Deleted link {} ({}): no subscribers left", link.id, link.url);
        }
        Ok(())
    }
}

/// Check that a URL is an absolute http(s) URL with a host.
fn validate_link_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ScrapperError::Validation("URL is empty".to_string()));
    }

    let parsed =
        Url::parse(url).map_err(|e| ScrapperError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ScrapperError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ScrapperError::Validation("URL has no host".to_string()));
    }

    Ok(url.to_string())
}
