use crate::aggregator::{AggregationStats, FeedAggregator};
use crate::config::{BotConfig, XCredentials};
use crate::fetcher::Fetcher;
use crate::llm_adapter::OllamaGenerator;
use crate::pipeline::{PipelineSettings, SelectionPipeline, SelectionResult};
use crate::publisher::{DryRunPublisher, XPublisher};
use crate::sources::build_sources;
use crate::store::FilePostedStore;
use crate::traits::Publisher;
use crate::types::Result;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Overall outcome of a run, as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    AllPublished,
    PartiallyPublished,
    NothingEligible,
    AllFailed,
}

impl RunStatus {
    pub fn from_selection(result: &SelectionResult) -> Self {
        let attempted = result.attempted();
        let published = result.published();
        if attempted == 0 {
            Self::NothingEligible
        } else if published == attempted {
            Self::AllPublished
        } else if published == 0 {
            Self::AllFailed
        } else {
            Self::PartiallyPublished
        }
    }

    /// Process exit code; `1` is reserved for fatal errors.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::AllPublished => 0,
            Self::PartiallyPublished => 2,
            Self::NothingEligible => 3,
            Self::AllFailed => 4,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AllPublished => "all published",
            Self::PartiallyPublished => "partially published",
            Self::NothingEligible => "nothing eligible",
            Self::AllFailed => "all failed",
        };
        f.write_str(s)
    }
}

/// Counts reported at the end of every run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub aggregation: AggregationStats,
    /// Entries parsed across all sources that responded
    pub fetched: usize,
    /// Left after the recency window and cross-source dedupe
    pub candidates: usize,
    pub already_posted: usize,
    pub eligible: usize,
    pub attempted: usize,
    pub published: usize,
    pub skipped_generation: usize,
    pub skipped_publish: usize,
    pub status: RunStatus,
}

impl RunReport {
    pub fn new(run_id: Uuid, aggregation: AggregationStats, selection: &SelectionResult) -> Self {
        Self {
            run_id,
            fetched: aggregation.entries_seen,
            aggregation,
            candidates: selection.considered,
            already_posted: selection.already_posted,
            eligible: selection.eligible,
            attempted: selection.attempted(),
            published: selection.published(),
            skipped_generation: selection.generation_failures(),
            skipped_publish: selection.publish_failures(),
            status: RunStatus::from_selection(selection),
        }
    }

    pub fn log_summary(&self) {
        info!(
            fetched = self.fetched,
            candidates = self.candidates,
            eligible = self.eligible,
            published = self.published,
            "Run finished: {}",
            self.status
        );
        info!(
            "Skipped: {} already posted, {} generation failures, {} publish failures, {} undated, {} outside window, {} duplicates, {} sources failed",
            self.already_posted,
            self.skipped_generation,
            self.skipped_publish,
            self.aggregation.undated,
            self.aggregation.out_of_window,
            self.aggregation.duplicates,
            self.aggregation.sources_failed
        );
    }
}

/// Aggregator and pipeline wired together for one invocation.
pub struct Bot {
    aggregator: FeedAggregator,
    pipeline: SelectionPipeline,
}

impl Bot {
    pub fn new(aggregator: FeedAggregator, pipeline: SelectionPipeline) -> Self {
        Self {
            aggregator,
            pipeline,
        }
    }

    /// Aggregate, then select and publish, relative to `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        async move {
            info!("Run started");
            let aggregation = self.aggregator.collect(now).await;
            let selection = self.pipeline.run(aggregation.candidates).await?;
            let report = RunReport::new(run_id, aggregation.stats, &selection);
            report.log_summary();
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

/// Credentials present (unless dry run) and the model server has the model.
pub async fn preflight(config: &BotConfig, dry_run: bool) -> Result<Option<XCredentials>> {
    let credentials = if dry_run {
        None
    } else {
        Some(XCredentials::from_env()?)
    };
    let generator = OllamaGenerator::new(config.generator.clone(), config.max_text_length)?;
    generator.check_model().await?;
    info!("Preflight checks passed");
    Ok(credentials)
}

/// Build every collaborator from `config`, run the preflight checks and
/// perform one full run.
pub async fn run(config: &BotConfig, dry_run: bool) -> Result<RunReport> {
    let credentials = preflight(config, dry_run).await?;

    let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);
    let aggregator = FeedAggregator::new(build_sources(&config.sources, fetcher), config);

    let generator = Arc::new(OllamaGenerator::new(
        config.generator.clone(),
        config.max_text_length,
    )?);
    let publisher: Arc<dyn Publisher> = match credentials {
        Some(credentials) => Arc::new(XPublisher::new(&config.publisher, credentials)?),
        None => Arc::new(DryRunPublisher),
    };
    let store = Arc::new(FilePostedStore::new(config.posted_links_path.clone()));

    let mut settings = PipelineSettings::from_config(config);
    if dry_run {
        settings.persist = false;
        settings.inter_post_delay = std::time::Duration::ZERO;
    }
    let pipeline = SelectionPipeline::new(generator, publisher, store, settings);

    Bot::new(aggregator, pipeline).run_once(Utc::now()).await
}
