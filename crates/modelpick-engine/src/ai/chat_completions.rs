//! OpenAI-compatible chat-completions advisory provider.
//!
//! Works against any endpoint speaking the `/v1/chat/completions` protocol;
//! the base URL is configurable for proxies and self-hosted gateways.

use super::advisory::{Advisory, DataSummary, build_prompt, parse_advisory};
use super::provider::AdvisoryProvider;
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 500;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

/// Configuration for [`ChatCompletionsProvider`].
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ChatCompletionsConfig {
    pub fn builder() -> ChatCompletionsConfigBuilder {
        ChatCompletionsConfigBuilder::default()
    }
}

/// Builder for [`ChatCompletionsConfig`].
#[derive(Default)]
pub struct ChatCompletionsConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl ChatCompletionsConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Request timeout; the advisory is abandoned once it elapses.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn build(self) -> ChatCompletionsConfig {
        ChatCompletionsConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Advisory provider over a chat-completions endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use modelpick_engine::ai::{ChatCompletionsConfig, ChatCompletionsProvider};
///
/// // Credential from OPENAI_API_KEY, or None when unset
/// let provider = ChatCompletionsProvider::from_env()?;
///
/// let config = ChatCompletionsConfig::builder().model("gpt-4o-mini").build();
/// let provider = ChatCompletionsProvider::with_config("your-api-key", config)?;
/// ```
pub struct ChatCompletionsProvider {
    api_key: String,
    config: ChatCompletionsConfig,
    client: Client,
}

impl ChatCompletionsProvider {
    /// Create a provider with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ChatCompletionsConfig::default())
    }

    /// Create a provider with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(api_key: impl Into<String>, config: ChatCompletionsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    /// Provider keyed by `OPENAI_API_KEY`; `Ok(None)` when it is unset or empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Self::new(key).map(Some),
            _ => Ok(None),
        }
    }

    fn call_api(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Chat completions API Error {}: {}",
                response.status(),
                response.text()?
            ));
        }

        let result: ChatResponse = response.json()?;
        extract_content(result)
    }
}

fn extract_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message)
        .map(|msg| msg.content)
        .ok_or_else(|| anyhow!("No response content from chat completions API"))
}

impl AdvisoryProvider for ChatCompletionsProvider {
    fn recommend(&self, summary: &DataSummary) -> Result<Advisory> {
        let prompt = build_prompt(summary);
        let reply = self.call_api(&prompt)?;
        debug!(provider = self.name(), chars = reply.len(), "Advisory reply received");
        parse_advisory(&reply, summary.problem_type)
    }

    fn name(&self) -> &str {
        "ChatCompletions"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}
