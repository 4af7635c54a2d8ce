use crate::config::{PublisherConfig, XCredentials};
use crate::oauth::OAuthSigner;
use crate::traits::Publisher;
use crate::types::{PublishFailure, PublishFailureKind, PublishReceipt, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct CreatedPost {
    data: Option<CreatedPostData>,
}

#[derive(Debug, Deserialize)]
struct CreatedPostData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
    title: Option<String>,
}

/// Posts to the X v2 tweets endpoint with OAuth 1.0a user context.
pub struct XPublisher {
    client: Client,
    signer: OAuthSigner,
    api_url: String,
}

impl XPublisher {
    pub fn new(config: &PublisherConfig, credentials: XCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            signer: OAuthSigner::new(credentials),
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl Publisher for XPublisher {
    fn publisher_name(&self) -> String {
        "x".to_string()
    }

    async fn publish(&self, text: &str) -> std::result::Result<PublishReceipt, PublishFailure> {
        let authorization = self
            .signer
            .authorization_header("POST", &self.api_url)
            .map_err(|e| PublishFailure::new(PublishFailureKind::Unknown, e.to_string()))?;

        let response = self
            .client
            .post(&self.api_url)
            .header(header::AUTHORIZATION, authorization)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::CREATED {
            let post_id = serde_json::from_str::<CreatedPost>(&body)
                .ok()
                .and_then(|p| p.data)
                .map(|d| d.id);
            info!("Post published (id {})", post_id.as_deref().unwrap_or("unknown"));
            return Ok(PublishReceipt { post_id });
        }

        let failure = classify_status(status, error_message(&body)).with_retry_after(retry_after);
        warn!("Publish failed: {}", failure);
        Err(failure)
    }
}

/// Map a non-201 response onto the failure taxonomy.
pub fn classify_status(status: StatusCode, message: String) -> PublishFailure {
    let kind = match status.as_u16() {
        429 => PublishFailureKind::RateLimited,
        500 | 502 | 503 | 504 => PublishFailureKind::Transient,
        401 | 403 => PublishFailureKind::PermissionDenied,
        400..=499 => PublishFailureKind::Rejected,
        _ => PublishFailureKind::Unknown,
    };
    PublishFailure::new(kind, message).with_status(status.as_u16())
}

fn classify_transport_error(e: reqwest::Error) -> PublishFailure {
    let kind = if e.is_timeout() || e.is_connect() || e.is_request() {
        PublishFailureKind::Transient
    } else {
        PublishFailureKind::Unknown
    };
    PublishFailure::new(kind, e.to_string())
}

fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { detail: Some(d), .. }) => d,
        Ok(ErrorBody { title: Some(t), .. }) => t,
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.chars().take(200).collect(),
    }
}

/// Logs the text instead of posting it.
#[derive(Default)]
pub struct DryRunPublisher;

#[async_trait]
impl Publisher for DryRunPublisher {
    fn publisher_name(&self) -> String {
        "dry-run".to_string()
    }

    async fn publish(&self, text: &str) -> std::result::Result<PublishReceipt, PublishFailure> {
        info!("[dry run] would post {} chars:\n{}", text.chars().count(), text);
        debug!("Dry run publish skipped network call");
        Ok(PublishReceipt { post_id: None })
    }
}
