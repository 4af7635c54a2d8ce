use crate::types::{GenerationRequest, ParsedEntry, PublishFailure, PublishReceipt, Result};
use async_trait::async_trait;

/// Trait for pulling entries from a single feed source
#[async_trait]
pub trait PullFeed: Send + Sync {
    /// Human-readable name for this source, carried onto every candidate
    fn source_name(&self) -> String;

    /// Fetch and parse the source's current entries, in feed order
    async fn pull(&self) -> Result<Vec<ParsedEntry>>;
}

/// Trait for the text-generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn generator_name(&self) -> String;

    /// Produce post text for one article
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Trait for the social-network publisher.
///
/// Failures carry a classification so the caller can decide whether the
/// single retry applies.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn publisher_name(&self) -> String;

    async fn publish(&self, text: &str) -> std::result::Result<PublishReceipt, PublishFailure>;
}

/// Durable storage for the posted-identifier log, oldest first
#[async_trait]
pub trait PostedStore: Send + Sync {
    async fn load(&self) -> Result<Vec<String>>;

    /// Replace the stored sequence with `identifiers`
    async fn save(&self, identifiers: &[String]) -> Result<()>;
}
