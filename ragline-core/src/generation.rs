//! Answer generation through an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RaglineError, Result};

/// GitHub Models inference endpoint, the default chat completions host.
const DEFAULT_GENERATION_BASE_URL: &str = "https://models.github.ai/inference";

/// The default chat model.
const DEFAULT_GENERATION_MODEL: &str = "openai/gpt-4o";

/// Low temperature keeps answers anchored to the supplied context.
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// The default completion budget.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Produces a chat completion from a system prompt and a user prompt.
///
/// Returns `Ok(None)` when the API answers successfully but without usable
/// content, so callers can substitute a fallback message.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Option<String>>;
}

/// A pool of API tokens, one of which is drawn at random per request.
///
/// Spreads traffic across several keys when the environment provides a
/// comma-separated list.
#[derive(Debug, Clone)]
pub struct TokenPool {
    tokens: Vec<String>,
}

impl TokenPool {
    /// Parse a comma-separated token list. Whitespace around entries is
    /// trimmed and empty entries are dropped.
    pub fn parse(raw: &str) -> Result<Self> {
        let tokens: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        if tokens.is_empty() {
            return Err(RaglineError::Config("no generation tokens configured".into()));
        }

        Ok(Self { tokens })
    }

    /// Pick a token uniformly at random.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.tokens[rng.gen_range(0..self.tokens.len())]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A [`ChatModel`] backed by an OpenAI-compatible chat completions endpoint.
///
/// # Configuration
///
/// - `model` – defaults to `openai/gpt-4o`.
/// - `base_url` – defaults to the GitHub Models inference endpoint.
/// - tokens – from the constructor or the `GITHUB_TOKEN` environment
///   variable, which may hold a comma-separated pool.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    pool: TokenPool,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatModel {
    /// Create a new chat model drawing tokens from the given pool.
    pub fn new(pool: TokenPool) -> Self {
        Self {
            client: reqwest::Client::new(),
            pool,
            base_url: DEFAULT_GENERATION_BASE_URL.into(),
            model: DEFAULT_GENERATION_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a new chat model using the `GITHUB_TOKEN` environment variable.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("GITHUB_TOKEN")
            .map_err(|_| RaglineError::Config("GITHUB_TOKEN environment variable not set".into()))?;
        Ok(Self::new(TokenPool::parse(&raw)?))
    }

    /// Override the chat completions base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the chat model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let token = {
            let mut rng = rand::thread_rng();
            self.pool.select(&mut rng).to_string()
        };

        debug!(model = %self.model, prompt_len = user_prompt.len(), "requesting chat completion");

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "chat completion request failed");
                RaglineError::Generation {
                    provider: "GitHub Models".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(model = %self.model, %status, "chat completion API error");
            return Err(RaglineError::Generation {
                provider: "GitHub Models".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse chat response");
            RaglineError::Generation {
                provider: "GitHub Models".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty()))
    }
}
