use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// A configured feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSourceSpec {
    pub name: String,
    pub url: String,
}

impl FeedSourceSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One entry as it comes out of the feed parser, before recency filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub identifier: String,
    pub link: String,
    pub title: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A prospective article to post about.
///
/// `identifier` is derived from the canonical article link, so repeated
/// fetches of the same article always produce the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub identifier: String,
    pub link: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

impl Candidate {
    /// Promote a parsed entry. Entries without a publish timestamp are not
    /// eligible since their recency cannot be checked.
    pub fn from_entry(entry: ParsedEntry, source: &str) -> Option<Self> {
        let published_at = entry.published_at?;
        Some(Self {
            identifier: entry.identifier,
            link: entry.link,
            title: entry.title,
            summary: entry.summary,
            source: source.to_string(),
            published_at,
        })
    }
}

/// Input handed to the text generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub link: String,
}

impl From<&Candidate> for GenerationRequest {
    fn from(candidate: &Candidate) -> Self {
        Self {
            title: candidate.title.clone(),
            summary: candidate.summary.clone(),
            source: candidate.source.clone(),
            link: candidate.link.clone(),
        }
    }
}

/// Confirmation returned by a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishFailureKind {
    RateLimited,
    Transient,
    PermissionDenied,
    Rejected,
    Unknown,
}

impl PublishFailureKind {
    /// Only rate limits and transient faults earn the single retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient)
    }
}

impl fmt::Display for PublishFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::PermissionDenied => "permission_denied",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Machine-readable publish failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFailure {
    pub kind: PublishFailureKind,
    pub status: Option<u16>,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl PublishFailure {
    pub fn new(kind: PublishFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {}): {}", self.kind, status, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to fetch source {source_name}: {reason}")]
    SourceFetch { source_name: String, reason: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Publish failed: {0}")]
    Publish(PublishFailure),

    #[error("Posted-set storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Preflight check failed: {0}")]
    Preflight(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<PublishFailure> for BotError {
    fn from(failure: PublishFailure) -> Self {
        Self::Publish(failure)
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
