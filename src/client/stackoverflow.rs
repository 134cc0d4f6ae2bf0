//! Stack Overflow question change detector.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{get_json, join_url, plural};
use crate::config::StackOverflowConfig;
use crate::detector::ChangeDetector;
use crate::error::{UpdateError, UpdateResult};
use crate::link::{stackoverflow_question_id, Link, LinkKind, TrackedResourceState, UpdateInfo};

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    items: Vec<QuestionItem>,
}

#[derive(Debug, Deserialize)]
struct QuestionItem {
    answer_count: i64,
    /// Unix seconds.
    last_activity_date: i64,
}

/// Client for the Stack Exchange API.
///
/// A reported change carries the answer count it saw as the link's next
/// state; the updater stores it together with the new timestamps.
#[derive(Debug, Clone)]
pub struct StackOverflowClient {
    client: Client,
    api_url: String,
    site: String,
}

impl StackOverflowClient {
    /// Create a client.
    pub fn new(client: Client, config: &StackOverflowConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            site: config.site.clone(),
        }
    }

    async fn fetch_question(&self, question_id: u64) -> UpdateResult<QuestionItem> {
        let url = join_url(&self.api_url, &format!("questions/{}", question_id));
        let response: QuestionsResponse =
            get_json(&self.client, &url, &[("site", self.site.clone())]).await?;
        response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| UpdateError::NotFound(format!("question {} not found", question_id)))
    }
}

#[async_trait]
impl ChangeDetector for StackOverflowClient {
    fn kind(&self) -> LinkKind {
        LinkKind::Question
    }

    async fn detect(
        &self,
        link: &Link,
        state: Option<&TrackedResourceState>,
    ) -> UpdateResult<UpdateInfo> {
        let prior_answers = state
            .and_then(TrackedResourceState::answer_count)
            .ok_or(UpdateError::AuxiliaryStateMissing(link.id))?;
        let question_id = stackoverflow_question_id(&link.url)
            .ok_or_else(|| UpdateError::NotFound(format!("not a question URL: {}", link.url)))?;

        let question = self.fetch_question(question_id).await?;
        let activity_at = DateTime::from_timestamp(question.last_activity_date, 0).ok_or_else(|| {
            UpdateError::SourceUnavailable(format!(
                "invalid last_activity_date {} for question {}",
                question.last_activity_date, question_id
            ))
        })?;

        if activity_at <= link.updated_at {
            debug!("Question {} unchanged", question_id);
            return Ok(UpdateInfo::unchanged(link));
        }

        let new_answers = question.answer_count - prior_answers;
        let summary = if new_answers > 0 {
            plural(new_answers as usize, "answer")
        } else {
            "Question has new activity".to_string()
        };

        Ok(
            UpdateInfo::changed(activity_at, summary).with_next_state(TrackedResourceState::Question {
                answer_count: question.answer_count,
            }),
        )
    }
}
