//! Resource classification by URL shape.

use std::fmt;

use url::{Host, Url};

/// Kind of external resource behind a tracked link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkKind {
    /// A GitHub repository.
    Repository,
    /// A Stack Overflow question.
    Question,
    /// Anything else. Never checked remotely.
    Unknown,
}

impl LinkKind {
    /// Classify a URL.
    ///
    /// Total and deterministic: anything that does not look like a supported
    /// resource, including unparsable input, is `Unknown`.
    pub fn classify(url: &str) -> Self {
        if github_repository(url).is_some() {
            LinkKind::Repository
        } else if stackoverflow_question_id(url).is_some() {
            LinkKind::Question
        } else {
            LinkKind::Unknown
        }
    }

    /// Whether detection for this kind needs auxiliary state.
    pub fn requires_state(&self) -> bool {
        matches!(self, LinkKind::Question)
    }

    /// Get the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Repository => "repository",
            LinkKind::Question => "question",
            LinkKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_on_host(url: &str, domain: &str) -> Option<Url> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = match parsed.host()? {
        Host::Domain(host) => host.to_lowercase(),
        _ => return None,
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);
    (host == domain).then_some(parsed)
}

/// Extract `(owner, repo)` from a GitHub repository URL.
///
/// Extra path segments (`/tree/main`, `/issues`) are ignored and a `.git`
/// suffix is stripped.
pub fn github_repository(url: &str) -> Option<(String, String)> {
    let parsed = parse_on_host(url, "github.com")?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Extract the numeric question id from a Stack Overflow question URL.
pub fn stackoverflow_question_id(url: &str) -> Option<u64> {
    let parsed = parse_on_host(url, "stackoverflow.com")?;
    let mut segments = parsed.path_segments()?;
    if segments.next()? != "questions" {
        return None;
    }
    segments.next()?.parse().ok()
}
