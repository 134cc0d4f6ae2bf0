//! GitHub repository change detector.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{get_json, join_url, plural};
use crate::config::GithubConfig;
use crate::datetime::{format_utc_datetime, to_rfc3339, DISPLAY_FORMAT};
use crate::detector::ChangeDetector;
use crate::error::{UpdateError, UpdateResult};
use crate::link::{github_repository, Link, LinkKind, TrackedResourceState, UpdateInfo};

/// Page size for the commit listing. Larger bursts are reported as this many.
const COMMITS_PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    pushed_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl RepositoryResponse {
    /// Newest of the push and metadata timestamps.
    fn changed_at(&self) -> Option<DateTime<Utc>> {
        match (self.pushed_at, self.updated_at) {
            (Some(pushed), Some(updated)) => Some(pushed.max(updated)),
            (pushed, updated) => pushed.or(updated),
        }
    }
}

/// Client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    timezone: String,
}

impl GitHubClient {
    /// Create a client. `timezone` is used for timestamps in summaries.
    pub fn new(client: Client, config: &GithubConfig, timezone: impl Into<String>) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            timezone: timezone.into(),
        }
    }

    async fn fetch_repository(&self, owner: &str, repo: &str) -> UpdateResult<RepositoryResponse> {
        let url = join_url(&self.api_url, &format!("repos/{}/{}", owner, repo));
        get_json(&self.client, &url, &[]).await
    }

    async fn count_commits_since(
        &self,
        owner: &str,
        repo: &str,
        since: &DateTime<Utc>,
    ) -> UpdateResult<usize> {
        let url = join_url(&self.api_url, &format!("repos/{}/{}/commits", owner, repo));
        let commits: Vec<IgnoredAny> = get_json(
            &self.client,
            &url,
            &[
                ("since", to_rfc3339(since)),
                ("per_page", COMMITS_PER_PAGE.to_string()),
            ],
        )
        .await?;
        Ok(commits.len())
    }
}

#[async_trait]
impl ChangeDetector for GitHubClient {
    fn kind(&self) -> LinkKind {
        LinkKind::Repository
    }

    async fn detect(
        &self,
        link: &Link,
        _state: Option<&TrackedResourceState>,
    ) -> UpdateResult<UpdateInfo> {
        let (owner, repo) = github_repository(&link.url)
            .ok_or_else(|| UpdateError::NotFound(format!("not a repository URL: {}", link.url)))?;

        let repository = self.fetch_repository(&owner, &repo).await?;
        let changed_at = repository.changed_at().ok_or_else(|| {
            UpdateError::SourceUnavailable(format!("no timestamps for {}/{}", owner, repo))
        })?;

        if changed_at <= link.updated_at {
            debug!("Repository {}/{} unchanged", owner, repo);
            return Ok(UpdateInfo::unchanged(link));
        }

        let summary = match self.count_commits_since(&owner, &repo, &link.updated_at).await {
            Ok(0) => None,
            Ok(count) => Some(plural(count, "commit")),
            Err(e) => {
                warn!("Failed to list commits for {}/{}: {}", owner, repo, e);
                None
            }
        };
        let summary = summary.unwrap_or_else(|| {
            format!(
                "Repository updated at {}",
                format_utc_datetime(&changed_at, &self.timezone, DISPLAY_FORMAT)
            )
        });

        Ok(UpdateInfo::changed(changed_at, summary))
    }
}
