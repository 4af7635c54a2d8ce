use crate::config::BotConfig;
use crate::posted::PostedSet;
use crate::text;
use crate::traits::{PostedStore, Publisher, TextGenerator};
use crate::types::{
    BotError, Candidate, GenerationRequest, PublishFailure, PublishFailureKind, PublishReceipt,
    Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Knobs the pipeline reads from `BotConfig`, split out so tests can set
/// zero delays without touching the rest of the configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub tweets_per_run: usize,
    pub max_text_length: usize,
    pub posted_set_cap: usize,
    pub generation_timeout: Duration,
    pub publish_timeout: Duration,
    pub retry_delay: Duration,
    pub inter_post_delay: Duration,
    /// When false the PostedSet is read but never written (dry runs).
    pub persist: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            tweets_per_run: config.tweets_per_run,
            max_text_length: config.max_text_length,
            posted_set_cap: config.posted_set_cap,
            generation_timeout: config.generation_timeout(),
            publish_timeout: config.publish_timeout(),
            retry_delay: config.publish_retry_delay(),
            inter_post_delay: config.inter_post_delay(),
            persist: true,
        }
    }
}

/// Terminal state of one selected candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Published {
        text: String,
        post_id: Option<String>,
        attempts: u32,
    },
    GenerationFailed {
        reason: String,
    },
    PublishFailed {
        text: String,
        failure: PublishFailure,
        attempts: u32,
    },
}

impl CandidateOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub candidate: Candidate,
    pub outcome: CandidateOutcome,
}

/// What one pipeline pass did, in processing order.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    /// Candidates handed in by the aggregator
    pub considered: usize,
    /// Dropped because their identifier was already posted
    pub already_posted: usize,
    /// Not yet posted, before the per-run limit is applied
    pub eligible: usize,
    pub reports: Vec<CandidateReport>,
}

impl SelectionResult {
    pub fn attempted(&self) -> usize {
        self.reports.len()
    }

    pub fn published(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_published()).count()
    }

    pub fn generation_failures(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, CandidateOutcome::GenerationFailed { .. }))
            .count()
    }

    pub fn publish_failures(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, CandidateOutcome::PublishFailed { .. }))
            .count()
    }

    pub fn published_identifiers(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_published())
            .map(|r| r.candidate.identifier.as_str())
            .collect()
    }
}

/// Chooses not-yet-posted candidates, publishes them one at a time and
/// records what went out.
pub struct SelectionPipeline {
    generator: Arc<dyn TextGenerator>,
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn PostedStore>,
    settings: PipelineSettings,
}

impl SelectionPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn PostedStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            publisher,
            store,
            settings,
        }
    }

    /// Run one selection pass over `candidates` (already ordered).
    ///
    /// A PostedSet load failure aborts before anything is published. A save
    /// failure after a publish aborts the remaining candidates.
    pub async fn run(&self, candidates: Vec<Candidate>) -> Result<SelectionResult> {
        info!(
            generator = %self.generator.generator_name(),
            publisher = %self.publisher.publisher_name(),
            "Starting selection pass"
        );
        let stored = self.store.load().await?;
        let mut posted = PostedSet::from_entries(stored, self.settings.posted_set_cap);
        info!("Loaded {} posted identifiers", posted.len());

        let considered = candidates.len();
        let fresh: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !posted.contains(&c.identifier))
            .collect();
        let eligible = fresh.len();
        let selected: Vec<Candidate> = fresh.into_iter().take(self.settings.tweets_per_run).collect();

        info!(
            "{} candidates, {} already posted, {} eligible, {} selected",
            considered,
            considered - eligible,
            eligible,
            selected.len()
        );

        let mut result = SelectionResult {
            considered,
            already_posted: considered - eligible,
            eligible,
            reports: Vec::with_capacity(selected.len()),
        };

        let mut published_before = false;
        for candidate in selected {
            let outcome = self.process(&candidate, &mut published_before).await;

            if outcome.is_published() {
                posted.push(candidate.identifier.clone());
                if self.settings.persist {
                    self.store.save(&posted.to_vec()).await.map_err(|e| {
                        error!(identifier = %candidate.identifier, "Published but could not record: {}", e);
                        e
                    })?;
                }
            }
            result.reports.push(CandidateReport { candidate, outcome });
        }

        if self.settings.persist {
            self.store.save(&posted.to_vec()).await?;
            debug!("Persisted {} posted identifiers", posted.len());
        }

        Ok(result)
    }

    async fn process(&self, candidate: &Candidate, published_before: &mut bool) -> CandidateOutcome {
        info!(identifier = %candidate.identifier, source = %candidate.source, "Processing: {}", candidate.title);

        let text = match self.generate(candidate).await {
            Ok(text) => text,
            Err(e) => {
                warn!(identifier = %candidate.identifier, "Skipping candidate: {}", e);
                return CandidateOutcome::GenerationFailed {
                    reason: e.to_string(),
                };
            }
        };

        if *published_before && !self.settings.inter_post_delay.is_zero() {
            debug!("Waiting {:?} before next post", self.settings.inter_post_delay);
            sleep(self.settings.inter_post_delay).await;
        }
        *published_before = true;

        let (outcome, attempts) = self.publish_with_retry(&text).await;
        match outcome {
            Ok(receipt) => {
                info!(
                    identifier = %candidate.identifier,
                    post_id = receipt.post_id.as_deref().unwrap_or("-"),
                    attempts,
                    "Published"
                );
                CandidateOutcome::Published {
                    text,
                    post_id: receipt.post_id,
                    attempts,
                }
            }
            Err(failure) => {
                warn!(identifier = %candidate.identifier, attempts, "Publish failed: {}", failure);
                CandidateOutcome::PublishFailed {
                    text,
                    failure,
                    attempts,
                }
            }
        }
    }

    async fn generate(&self, candidate: &Candidate) -> Result<String> {
        let request = GenerationRequest::from(candidate);
        let text = match timeout(self.settings.generation_timeout, self.generator.generate(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BotError::Generation(format!(
                    "timed out after {:?}",
                    self.settings.generation_timeout
                )))
            }
        };
        text::validate_length(&text, self.settings.max_text_length).map_err(BotError::Generation)?;
        Ok(text)
    }

    /// One attempt, plus exactly one more for retryable failures.
    async fn publish_with_retry(
        &self,
        text: &str,
    ) -> (std::result::Result<PublishReceipt, PublishFailure>, u32) {
        match self.publish_once(text).await {
            Ok(receipt) => (Ok(receipt), 1),
            Err(failure) if failure.is_retryable() => {
                let wait = failure
                    .retry_after
                    .map_or(self.settings.retry_delay, |ra| ra.min(self.settings.retry_delay));
                warn!("Publish failed ({}), retrying once in {:?}", failure, wait);
                if !wait.is_zero() {
                    sleep(wait).await;
                }
                (self.publish_once(text).await, 2)
            }
            Err(failure) => (Err(failure), 1),
        }
    }

    async fn publish_once(&self, text: &str) -> std::result::Result<PublishReceipt, PublishFailure> {
        match timeout(self.settings.publish_timeout, self.publisher.publish(text)).await {
            Ok(result) => result,
            Err(_) => Err(PublishFailure::new(
                PublishFailureKind::Transient,
                format!("timed out after {:?}", self.settings.publish_timeout),
            )),
        }
    }
}
