use anyhow::Context;
use clap::{Parser, Subcommand};
use news_bot::config::BotConfig;
use news_bot::llm_adapter::OllamaGenerator;
use news_bot::{bot, logging};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "news-bot", about = "Posts commentary on fresh tech news", version)]
struct Cli {
    /// TOML config file (defaults to $NEWS_BOT_CONFIG, then config/news-bot.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch feeds, pick new articles and publish them
    Run {
        /// Generate and log posts without publishing or recording them
        #[arg(long)]
        dry_run: bool,
    },
    /// Verify credentials and the model server, then exit
    Check,
    /// Print the configured feed sources
    Sources,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match BotConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("news-bot: {}", e);
            return ExitCode::from(1);
        }
    };
    logging::configure_logging(&config.logging);

    match execute(cli.command, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn execute(command: Command, config: &BotConfig) -> anyhow::Result<u8> {
    match command {
        Command::Run { dry_run } => {
            info!(
                "Starting news-bot ({} sources, {} per run, {}h window{})",
                config.sources.len(),
                config.tweets_per_run,
                config.rss_hours,
                if dry_run { ", dry run" } else { "" }
            );
            let report = bot::run(config, dry_run).await.context("run aborted")?;
            Ok(report.status.exit_code())
        }
        Command::Check => {
            let generator = OllamaGenerator::new(config.generator.clone(), config.max_text_length)?;
            if !generator.check_connection().await {
                anyhow::bail!("model server at {} is not reachable", config.generator.base_url);
            }
            bot::preflight(config, false).await.context("preflight failed")?;
            println!("All checks passed");
            Ok(0)
        }
        Command::Sources => {
            for source in &config.sources {
                println!("{}\t{}", source.name, source.url);
            }
            Ok(0)
        }
    }
}
