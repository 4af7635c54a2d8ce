use crate::types::{BotError, FeedSourceSpec, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_CONFIG_PATH: &str = "NEWS_BOT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/news-bot.toml";
/// One year; anything larger is almost certainly a typo.
pub const MAX_RSS_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
    pub max_concurrent_fetches: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-bot/0.1".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
            max_concurrent_fetches: 4,
        }
    }
}

/// Settings for the local model server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_seconds: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "gemma3:4b".to_string(),
            temperature: 1.0,
            top_p: 0.95,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub api_url: String,
    pub timeout_seconds: u64,
    pub retry_delay_seconds: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.x.com/2/tweets".to_string(),
            timeout_seconds: 30,
            retry_delay_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for the daily rolling log file. Stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub tweets_per_run: usize,
    pub rss_hours: i64,
    pub max_text_length: usize,
    pub posted_set_cap: usize,
    pub posted_links_path: PathBuf,
    pub inter_post_delay_seconds: u64,
    pub sources: Vec<FeedSourceSpec>,
    pub fetch: FetchConfig,
    pub generator: GeneratorConfig,
    pub publisher: PublisherConfig,
    pub logging: LoggingConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            tweets_per_run: 1,
            rss_hours: 12,
            max_text_length: 25_000,
            posted_set_cap: 1000,
            posted_links_path: PathBuf::from("posted_links.txt"),
            inter_post_delay_seconds: 60,
            sources: default_sources(),
            fetch: FetchConfig::default(),
            generator: GeneratorConfig::default(),
            publisher: PublisherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration in layers:
    /// 1) built-in defaults
    /// 2) TOML file: explicit path, else $NEWS_BOT_CONFIG, else config/news-bot.toml if present
    /// 3) environment overrides
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => Some(p.to_path_buf()),
            None => match env::var(ENV_CONFIG_PATH) {
                Ok(p) => Some(PathBuf::from(p)),
                Err(_) => {
                    let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
                    fallback.exists().then_some(fallback)
                }
            },
        };

        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            BotError::Config(format!("reading config from {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_parse("TWEETS_PER_RUN")? {
            self.tweets_per_run = v;
        }
        if let Some(v) = env_parse("RSS_HOURS")? {
            self.rss_hours = v;
        }
        // X_TWEET_MAX_LENGTH is the older name for the same bound.
        if let Some(v) = env_parse("X_TWEET_MAX_LENGTH")? {
            self.max_text_length = v;
        }
        if let Some(v) = env_parse("MAX_TEXT_LENGTH")? {
            self.max_text_length = v;
        }
        if let Some(v) = env_parse("POSTED_SET_CAP")? {
            self.posted_set_cap = v;
        }
        if let Ok(v) = env::var("POSTED_LINKS_PATH") {
            self.posted_links_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("OLLAMA_URL") {
            self.generator.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("OLLAMA_MODEL") {
            self.generator.model = v;
        }
        if let Some(v) = env_parse("FEED_TIMEOUT_SECONDS")? {
            self.fetch.timeout_seconds = v;
        }
        if let Some(v) = env_parse("GENERATION_TIMEOUT_SECONDS")? {
            self.generator.timeout_seconds = v;
        }
        if let Some(v) = env_parse("PUBLISH_TIMEOUT_SECONDS")? {
            self.publisher.timeout_seconds = v;
        }
        if let Ok(v) = env::var("LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tweets_per_run == 0 {
            return Err(BotError::Config("tweets_per_run must be at least 1".into()));
        }
        if self.rss_hours <= 0 || self.rss_hours > MAX_RSS_HOURS {
            return Err(BotError::Config(format!(
                "rss_hours must be between 1 and {}, got {}",
                MAX_RSS_HOURS, self.rss_hours
            )));
        }
        if self.max_text_length == 0 {
            return Err(BotError::Config("max_text_length must be positive".into()));
        }
        if self.posted_set_cap == 0 {
            return Err(BotError::Config("posted_set_cap must be positive".into()));
        }
        if self.sources.is_empty() {
            return Err(BotError::Config("no feed sources configured".into()));
        }
        if let Some(bad) = self
            .sources
            .iter()
            .find(|s| !crate::rss_utils::url::is_valid_feed_url(&s.url))
        {
            return Err(BotError::Config(format!(
                "source {:?} has an invalid URL: {}",
                bad.name, bad.url
            )));
        }
        Ok(())
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_seconds)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generator.timeout_seconds)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publisher.timeout_seconds)
    }

    pub fn inter_post_delay(&self) -> Duration {
        Duration::from_secs(self.inter_post_delay_seconds)
    }

    pub fn publish_retry_delay(&self) -> Duration {
        Duration::from_secs(self.publisher.retry_delay_seconds)
    }
}

/// OAuth 1.0a user-context credentials. Bearer tokens cannot post.
#[derive(Clone)]
pub struct XCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl XCredentials {
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BotError::Config(format!("{} must be set", name)))
        };
        Ok(Self {
            api_key: read("X_API_KEY")?,
            api_secret: read("X_API_SECRET")?,
            access_token: read("X_ACCESS_TOKEN")?,
            access_token_secret: read("X_ACCESS_TOKEN_SECRET")?,
        })
    }
}

impl std::fmt::Debug for XCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XCredentials")
            .field("api_key_len", &self.api_key.len())
            .field("access_token_len", &self.access_token.len())
            .finish()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| BotError::Config(format!("{} has an invalid value: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

pub fn default_sources() -> Vec<FeedSourceSpec> {
    vec![
        FeedSourceSpec::new("Android Police", "https://www.androidpolice.com/feed/"),
        FeedSourceSpec::new("GSMArena", "https://www.gsmarena.com/rss-news-reviews.php3"),
        FeedSourceSpec::new("Android Central", "https://www.androidcentral.com/feed"),
        FeedSourceSpec::new("The Verge", "https://www.theverge.com/rss/index.xml"),
        FeedSourceSpec::new("TechCrunch", "https://techcrunch.com/feed/"),
        FeedSourceSpec::new("9to5Mac", "https://9to5mac.com/feed/"),
        FeedSourceSpec::new("MacRumors", "https://www.macrumors.com/macrumors.xml"),
        FeedSourceSpec::new(
            "Google News - Nvidia",
            "https://news.google.com/rss/search?q=Nvidia&hl=en-US&gl=US&ceid=US:en",
        ),
        FeedSourceSpec::new(
            "Google News - Apple",
            "https://news.google.com/rss/search?q=Apple+iPhone+iPad&hl=en-US&gl=US&ceid=US:en",
        ),
        FeedSourceSpec::new(
            "Google News - AMD",
            "https://news.google.com/rss/search?q=AMD&hl=en-US&gl=US&ceid=US:en",
        ),
        FeedSourceSpec::new(
            "Google News - Mobile",
            "https://news.google.com/rss/search?q=mobile+phone+smartphone&hl=en-US&gl=US&ceid=US:en",
        ),
    ]
}
