//! HTTP clients for the external sources and the bot.
//!
//! All clients share one `reqwest::Client` configuration built from
//! `[http]`. Failures are mapped onto the per-link error taxonomy: 404 and
//! 410 mean the resource is gone, anything else is a source failure.

pub mod bot;
pub mod github;
pub mod stackoverflow;

pub use bot::BotClient;
pub use github::GitHubClient;
pub use stackoverflow::StackOverflowClient;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{UpdateError, UpdateResult};
use crate::{Result, ScrapperError};

/// Build the shared HTTP client.
pub fn build_http_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.total_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| ScrapperError::Http(format!("failed to create HTTP client: {}", e)))
}

/// Map a non-success status to a per-link error.
fn status_error(status: StatusCode, url: &str) -> UpdateError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            UpdateError::NotFound(format!("HTTP {} for {}", status.as_u16(), url))
        }
        _ => UpdateError::SourceUnavailable(format!("HTTP {} for {}", status.as_u16(), url)),
    }
}

/// GET a JSON document.
async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> UpdateResult<T> {
    debug!("GET {}", url);

    let response = client
        .get(url)
        .query(query)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| UpdateError::SourceUnavailable(format!("request to {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, url));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| UpdateError::SourceUnavailable(format!("invalid response from {}: {}", url, e)))
}

/// Join a base URL and a path without doubling slashes.
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Pluralize a count for summaries.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 new {}", noun)
    } else {
        format!("{} new {}s", count, noun)
    }
}
