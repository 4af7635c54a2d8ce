#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use news_bot::rss_utils::url::canonical_identifier;
use news_bot::traits::{PostedStore, Publisher, PullFeed, TextGenerator};
use news_bot::{
    BotError, Candidate, GenerationRequest, ParsedEntry, PipelineSettings, PublishFailure,
    PublishFailureKind, PublishReceipt, Result,
};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub fn entry(link: &str, title: &str, published_at: Option<DateTime<Utc>>) -> ParsedEntry {
    ParsedEntry {
        identifier: canonical_identifier(link),
        link: link.to_string(),
        title: title.to_string(),
        summary: format!("Summary of {}", title),
        published_at,
    }
}

pub fn candidate(slug: &str, published_at: DateTime<Utc>) -> Candidate {
    let link = format!("https://example.com/news/{}", slug);
    Candidate {
        identifier: canonical_identifier(&link),
        link,
        title: format!("Story {}", slug),
        summary: String::new(),
        source: "Example".to_string(),
        published_at,
    }
}

/// Pipeline settings with no waiting and the default 1000 cap.
pub fn settings(tweets_per_run: usize) -> PipelineSettings {
    PipelineSettings {
        tweets_per_run,
        max_text_length: 280,
        posted_set_cap: 1000,
        generation_timeout: Duration::from_secs(5),
        publish_timeout: Duration::from_secs(5),
        retry_delay: Duration::ZERO,
        inter_post_delay: Duration::ZERO,
        persist: true,
    }
}

/// Feed source returning fixed entries, optionally after a delay or failing.
pub struct StaticFeed {
    pub name: String,
    pub entries: Vec<ParsedEntry>,
    pub delay: Duration,
    pub fail: bool,
}

impl StaticFeed {
    pub fn new(name: &str, entries: Vec<ParsedEntry>) -> Self {
        Self {
            name: name.to_string(),
            entries,
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PullFeed for StaticFeed {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    async fn pull(&self) -> Result<Vec<ParsedEntry>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(BotError::SourceFetch {
                source_name: self.name.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.entries.clone())
    }
}

/// Generator producing "<title> #Technews <link>", failing for chosen titles.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub fail_titles: HashSet<String>,
    pub empty_titles: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn failing_on(titles: &[&str]) -> Self {
        Self {
            fail_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn generator_name(&self) -> String {
        "scripted".to_string()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.title.clone());
        if self.fail_titles.contains(&request.title) {
            return Err(BotError::Generation("model unavailable".to_string()));
        }
        if self.empty_titles.contains(&request.title) {
            return Ok(String::new());
        }
        Ok(format!("{} #Technews {}", request.title, request.link))
    }
}

/// Publisher that replays scripted results, then succeeds.
#[derive(Default)]
pub struct ScriptedPublisher {
    pub script: Mutex<VecDeque<std::result::Result<PublishReceipt, PublishFailure>>>,
    pub attempts: Mutex<Vec<String>>,
}

impl ScriptedPublisher {
    pub fn with_script(
        script: Vec<std::result::Result<PublishReceipt, PublishFailure>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

pub fn failure(kind: PublishFailureKind) -> std::result::Result<PublishReceipt, PublishFailure> {
    Err(PublishFailure::new(kind, "scripted failure"))
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    fn publisher_name(&self) -> String {
        "scripted".to_string()
    }

    async fn publish(&self, text: &str) -> std::result::Result<PublishReceipt, PublishFailure> {
        let n = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(text.to_string());
            attempts.len()
        };
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(PublishReceipt {
                post_id: Some(format!("post-{}", n)),
            }),
        }
    }
}

/// PostedStore kept in memory, with switchable load/save failures.
#[derive(Default)]
pub struct MemoryStore {
    pub entries: Mutex<Vec<String>>,
    pub saves: Mutex<usize>,
    pub fail_load: bool,
    pub fail_save: bool,
}

impl MemoryStore {
    pub fn with_entries(entries: Vec<String>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl PostedStore for MemoryStore {
    async fn load(&self) -> Result<Vec<String>> {
        if self.fail_load {
            return Err(BotError::Storage("disk unavailable".to_string()));
        }
        Ok(self.entries())
    }

    async fn save(&self, identifiers: &[String]) -> Result<()> {
        if self.fail_save {
            return Err(BotError::Storage("disk full".to_string()));
        }
        *self.entries.lock().unwrap() = identifiers.to_vec();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
