pub mod aggregator;
pub mod bot;
pub mod config;
pub mod fetcher;
pub mod llm_adapter;
pub mod logging;
pub mod oauth;
pub mod parser;
pub mod pipeline;
pub mod posted;
pub mod publisher;
pub mod rss_utils;
pub mod sources;
pub mod store;
pub mod text;
pub mod traits;
pub mod types;

pub use aggregator::{Aggregation, AggregationStats, FeedAggregator};
pub use bot::{Bot, RunReport, RunStatus};
pub use config::{BotConfig, FetchConfig, GeneratorConfig, PublisherConfig, XCredentials};
pub use fetcher::Fetcher;
pub use llm_adapter::OllamaGenerator;
pub use parser::FeedParser;
pub use pipeline::{CandidateOutcome, PipelineSettings, SelectionPipeline, SelectionResult};
pub use posted::PostedSet;
pub use publisher::{DryRunPublisher, XPublisher};
pub use sources::RssFeedSource;
pub use store::FilePostedStore;
pub use types::*;
