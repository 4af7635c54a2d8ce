use crate::traits::PullFeed;
use crate::types::{BotError, FeedSourceSpec, ParsedEntry, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Generic RSS/Atom feed source implementation
pub struct RssFeedSource {
    spec: FeedSourceSpec,
    fetcher: Arc<Fetcher>,
    parser: FeedParser,
}

impl RssFeedSource {
    /// Sources built for one run share a single HTTP client.
    pub fn new(spec: FeedSourceSpec, fetcher: Arc<Fetcher>) -> Self {
        Self {
            spec,
            fetcher,
            parser: FeedParser::new(),
        }
    }
}

#[async_trait]
impl PullFeed for RssFeedSource {
    fn source_name(&self) -> String {
        self.spec.name.clone()
    }

    async fn pull(&self) -> Result<Vec<ParsedEntry>> {
        let content = self.fetcher.fetch_feed(&self.spec.name, &self.spec.url).await?;

        let entries = self
            .parser
            .parse_feed(&content)
            .map_err(|e| BotError::SourceFetch {
                source_name: self.spec.name.clone(),
                reason: e.to_string(),
            })?;

        info!("Pulled {} entries from {}", entries.len(), self.spec.name);
        Ok(entries)
    }
}

/// Build one `RssFeedSource` per configured spec, in configuration order.
pub fn build_sources(specs: &[FeedSourceSpec], fetcher: Arc<Fetcher>) -> Vec<Box<dyn PullFeed>> {
    specs
        .iter()
        .cloned()
        .map(|spec| Box::new(RssFeedSource::new(spec, fetcher.clone())) as Box<dyn PullFeed>)
        .collect()
}
