//! LLM completion client
//!
//! Supports Groq, OpenAI, and any OpenAI-compatible API (Ollama, vLLM, etc.).

use crate::config::LlmConfig;
use crate::error::{ApiError, UpstreamError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider-neutral chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    /// Ask the provider to emit a JSON object instead of free text
    pub json_mode: bool,
}

/// Anything that can turn a chat completion request into reply text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError>;

    fn name(&self) -> &str;
}

/// HTTP client for hosted completion providers
pub struct LlmClient {
    http: Client,
    provider: LlmProvider,
}

#[derive(Debug, Clone)]
pub enum LlmProvider {
    Groq {
        api_key: Option<String>,
        model: String,
    },
    OpenAI {
        api_key: Option<String>,
        model: String,
        base_url: String,
    },
    /// OpenAI-compatible API (Ollama, vLLM, etc.)
    Compatible {
        api_key: Option<String>,
        model: String,
        base_url: String,
    },
}

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

// ============ Request/Response types ============

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(provider: LlmProvider) -> Self {
        Self {
            http: Client::new(),
            provider,
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self, ApiError> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty());

        let provider = match config.provider.to_lowercase().as_str() {
            "groq" => LlmProvider::Groq {
                api_key,
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
            },
            "openai" | "gpt" => LlmProvider::OpenAI {
                api_key,
                model: config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
                base_url: config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com".to_string()),
            },
            "ollama" => LlmProvider::Compatible {
                api_key: None,
                model: config.model.clone().unwrap_or_else(|| "qwen2.5:14b".to_string()),
                base_url: config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
            },
            "compatible" | "custom" => LlmProvider::Compatible {
                api_key,
                model: config.model.clone().ok_or_else(|| {
                    ApiError::Config("model required for compatible provider".into())
                })?,
                base_url: config.base_url.clone().ok_or_else(|| {
                    ApiError::Config("base_url required for compatible provider".into())
                })?,
            },
            _ => {
                return Err(ApiError::Config(format!(
                    "Unknown LLM provider: {}",
                    config.provider
                )))
            }
        };

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self { http, provider })
    }

    /// Chat completions endpoint, key and model for the configured provider
    fn endpoint(&self) -> (String, Option<&str>, &str) {
        let (base_url, api_key, model) = match &self.provider {
            LlmProvider::Groq { api_key, model } => (GROQ_BASE_URL, api_key.as_deref(), model),
            LlmProvider::OpenAI {
                api_key,
                model,
                base_url,
            } => (base_url.as_str(), api_key.as_deref(), model),
            LlmProvider::Compatible {
                api_key,
                model,
                base_url,
            } => (base_url.as_str(), api_key.as_deref(), model),
        };

        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        (url, api_key, model.as_str())
    }

    fn requires_key(&self) -> bool {
        !matches!(self.provider, LlmProvider::Compatible { .. })
    }

    /// True when the provider needs a key and none is configured
    pub fn missing_credential(&self) -> bool {
        self.requires_key() && self.endpoint().1.is_none()
    }

    fn build_request(model: &str, request: &CompletionRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: model.to_string(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
            response_format: request.json_mode.then(|| ResponseFormat {
                r#type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        if self.missing_credential() {
            return Err(UpstreamError::MissingCredential);
        }
        let (url, api_key, model) = self.endpoint();

        let body = Self::build_request(model, request);
        let mut req = self
            .http
            .post(&url)
            .header("content-type", "application/json");

        if let Some(key) = api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.json(&body).send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        tracing::debug!("LLM raw response: {}", truncate(&text, 500));

        read_completion(status, &text)
    }

    fn name(&self) -> &str {
        match &self.provider {
            LlmProvider::Groq { .. } => "Groq",
            LlmProvider::OpenAI { .. } => "OpenAI",
            LlmProvider::Compatible { model, .. } => model,
        }
    }
}

/// Extract the first choice's content from a chat completion reply.
///
/// Non-2xx statuses and bodies that are not a completion envelope are
/// provider failures; the model's own text is checked later.
fn read_completion(status: u16, text: &str) -> Result<String, UpstreamError> {
    let provider_error = || UpstreamError::Provider {
        status,
        body: truncate(text, 200).to_string(),
    };

    if !(200..300).contains(&status) {
        return Err(provider_error());
    }

    let response: OpenAIResponse = serde_json::from_str(text).map_err(|_| provider_error())?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(UpstreamError::EmptyResponse)
}

/// Cut a string to at most `max` bytes on a char boundary
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
