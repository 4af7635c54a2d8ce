use crate::config::FetchConfig;
use crate::types::{BotError, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Download one feed document. Any transport error, non-2xx status or
    /// oversized body is reported as a `SourceFetch` error for `source_name`.
    pub async fn fetch_feed(&self, source_name: &str, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed: {} ({})", source_name, url);

        let fail = |reason: String| BotError::SourceFetch {
            source_name: source_name.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(describe_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let limit_bytes = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit_bytes {
                return Err(fail(format!(
                    "feed too large: {}MB",
                    content_length as usize / (1024 * 1024)
                )));
            }
        }

        let content = response
            .text()
            .await
            .map_err(|e| fail(describe_request_error(&e)))?;
        if content.len() > limit_bytes {
            return Err(fail(format!("feed too large: {} bytes", content.len())));
        }

        info!(
            "Fetched feed: {} ({} bytes in {}ms)",
            source_name,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
