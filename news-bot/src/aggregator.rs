use crate::config::BotConfig;
use crate::traits::PullFeed;
use crate::types::{BotError, Candidate, ParsedEntry, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Counters describing one aggregation pass, reported in the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub sources_total: usize,
    pub sources_failed: usize,
    pub entries_seen: usize,
    pub undated: usize,
    pub out_of_window: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub candidates: Vec<Candidate>,
    pub stats: AggregationStats,
}

/// Pulls every configured source and turns the entries into an ordered,
/// deduplicated, recency-filtered candidate list.
pub struct FeedAggregator {
    sources: Vec<Box<dyn PullFeed>>,
    recency_window: ChronoDuration,
    fetch_timeout: Duration,
    max_concurrent_fetches: usize,
}

impl FeedAggregator {
    pub fn new(sources: Vec<Box<dyn PullFeed>>, config: &BotConfig) -> Self {
        Self {
            sources,
            recency_window: ChronoDuration::try_hours(config.rss_hours).unwrap_or(ChronoDuration::MAX),
            fetch_timeout: config.feed_timeout(),
            max_concurrent_fetches: config.fetch.max_concurrent_fetches.max(1),
        }
    }

    pub fn with_recency_window(mut self, window: ChronoDuration) -> Self {
        self.recency_window = window;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n.max(1);
        self
    }

    /// Pull all sources (bounded parallelism, results kept in source order)
    /// and select candidates relative to `now`. A failing source is logged
    /// and skipped; if every source fails the result is simply empty.
    pub async fn collect(&self, now: DateTime<Utc>) -> Aggregation {
        info!("Fetching {} feed sources", self.sources.len());

        let fetch_timeout = self.fetch_timeout;
        let pulls: Vec<(String, Result<Vec<ParsedEntry>>)> = stream::iter(self.sources.iter())
            .map(|source| async move {
                let name = source.source_name();
                let result = match timeout(fetch_timeout, source.pull()).await {
                    Ok(result) => result,
                    Err(_) => Err(BotError::SourceFetch {
                        source_name: name.clone(),
                        reason: format!("timed out after {:?}", fetch_timeout),
                    }),
                };
                (name, result)
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut failed = 0usize;
        let mut per_source = Vec::with_capacity(pulls.len());
        for (name, result) in pulls {
            match result {
                Ok(entries) => {
                    info!(source = %name, entries = entries.len(), "Source fetched");
                    per_source.push((name, entries));
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "Skipping source");
                    failed += 1;
                }
            }
        }

        let mut aggregation = select_candidates(per_source, now, self.recency_window);
        aggregation.stats.sources_total = self.sources.len();
        aggregation.stats.sources_failed = failed;

        info!(
            "Aggregated {} candidates from {} entries ({} sources failed, {} undated, {} outside {}h window, {} duplicates)",
            aggregation.candidates.len(),
            aggregation.stats.entries_seen,
            failed,
            aggregation.stats.undated,
            aggregation.stats.out_of_window,
            self.recency_window.num_hours(),
            aggregation.stats.duplicates
        );
        aggregation
    }
}

/// Recency filter, cross-source dedup and ordering over already-pulled
/// entries, given in source order.
///
/// - kept: `now - window <= published_at <= now`; undated entries are dropped
/// - first occurrence of an identifier wins, walking sources in order
/// - output is newest first; ties keep source order, then feed order
pub fn select_candidates(
    per_source: Vec<(String, Vec<ParsedEntry>)>,
    now: DateTime<Utc>,
    window: ChronoDuration,
) -> Aggregation {
    let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut stats = AggregationStats::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for (source, entries) in per_source {
        for entry in entries {
            stats.entries_seen += 1;

            let Some(published_at) = entry.published_at else {
                stats.undated += 1;
                continue;
            };
            if published_at < cutoff || published_at > now {
                stats.out_of_window += 1;
                continue;
            }
            if !seen.insert(entry.identifier.clone()) {
                debug!("Duplicate entry across sources: {}", entry.identifier);
                stats.duplicates += 1;
                continue;
            }
            if let Some(candidate) = Candidate::from_entry(entry, &source) {
                candidates.push(candidate);
            }
        }
    }

    // Stable sort: equal timestamps keep source order, then feed order.
    candidates.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    Aggregation { candidates, stats }
}
