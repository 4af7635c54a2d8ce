use crate::config::GeneratorConfig;
use crate::text;
use crate::traits::TextGenerator;
use crate::types::{BotError, GenerationRequest, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PROMPT_SUMMARY_CHARS: usize = 200;

const STYLE_DIRECTIVE: &str = "You are a witty, opinionated tech commentator who writes posts people want to share.
- Funny, engaging and human; end with an open question for readers to answer.
- Focus on mobile phones, Intel, Nvidia, Apple, AMD, Android, Linux, macOS, Windows, AI and trending tech.
- Prefer Linux and macOS over Windows, Android over iOS, open source over closed source, one-time payments over subscriptions.
- Use emojis sparingly (1-2 at most).
- Write ONLY the post text. No explanations, no meta-commentary, no phrases like \"here's a tweet\" or \"as an AI\".
- Plain text only. NO markdown: no asterisks, no underscores, no bold or italics.
- Put each sentence on its own line.
- Always include exactly one hashtag: #Technews.
- Keep it concise; the article link is added automatically.
- Start directly with the post content, no preamble.";

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    #[serde(default)]
    name: String,
}

/// Text generator backed by a local Ollama server.
pub struct OllamaGenerator {
    client: Client,
    config: GeneratorConfig,
    max_text_length: usize,
}

impl OllamaGenerator {
    pub fn new(config: GeneratorConfig, max_text_length: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            config,
            max_text_length,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// True when the server answers the model listing.
    pub async fn check_connection(&self) -> bool {
        match self.fetch_tags().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Model server probe failed: {}", e);
                false
            }
        }
    }

    /// Fail unless the server is reachable and lists the configured model.
    /// Listed names carry a tag suffix, so a prefix match is enough.
    pub async fn check_model(&self) -> Result<()> {
        let tags = self.fetch_tags().await.map_err(|e| {
            BotError::Preflight(format!(
                "model server at {} is not reachable: {}",
                self.config.base_url, e
            ))
        })?;

        if tags.models.iter().any(|m| m.name.starts_with(&self.config.model)) {
            info!("Model {} is available", self.config.model);
            Ok(())
        } else {
            let listed: Vec<&str> = tags.models.iter().map(|m| m.name.as_str()).collect();
            Err(BotError::Preflight(format!(
                "model {} is not installed (available: {})",
                self.config.model,
                listed.join(", ")
            )))
        }
    }

    async fn fetch_tags(&self) -> Result<TagsResponse> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let body = GenerateBody {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
            },
        };

        let response = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Generation(format!("calling model server: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Generation(format!(
                "model server returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BotError::Generation(format!("decoding model response: {}", e)))?;
        Ok(parsed.response)
    }
}

/// Full prompt: the fixed style directive followed by the article details.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let summary: String = request.summary.chars().take(PROMPT_SUMMARY_CHARS).collect();
    format!(
        "{}\n\nWrite a funny, engaging post about this tech news:\n\nTitle: {}\nSummary: {}\nSource: {}\n\nRequirements:\n- Write ONLY the post text\n- One sentence per line\n- Use humor, sarcasm or a hot take\n- End with an open question\n\nPost:",
        STYLE_DIRECTIVE, request.title, summary, request.source
    )
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn generator_name(&self) -> String {
        format!("ollama ({})", self.config.model)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!("Generating post for: {}", request.title);
        let raw = self.complete(build_prompt(request)).await?;

        let mut body = text::clean_generated_text(&raw);
        if !body.contains('\n') {
            debug!("No line breaks in model output, adding them");
            body = text::add_line_breaks(&body);
        }
        if body.is_empty() {
            return Err(BotError::Generation("model returned empty text".into()));
        }
        if let Err(reason) = text::validate_style(&body) {
            warn!("Rejected generated text ({}): {}", reason, preview(&body));
            return Err(BotError::Generation(format!("style check failed: {}", reason)));
        }

        Ok(text::compose_with_link(&body, &request.link, self.max_text_length))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
