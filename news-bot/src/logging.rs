use crate::config::LoggingConfig;
use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Stdout logging, plus a daily rolling file when `log_dir` is set.
/// `RUST_LOG` overrides the default filter for both.
pub fn configure_logging(config: &LoggingConfig) {
    let stdout_log = fmt::layer().with_writer(io::stdout).with_filter(env_filter());

    let file_log = config.log_dir.as_ref().map(|dir| {
        let file_appender = rolling::daily(dir, "news-bot.log");
        fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_filter(env_filter())
    });

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}
