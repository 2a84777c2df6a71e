//! Error types for the sentiment service

use thiserror::Error;

/// Failures obtaining or interpreting the provider's answer
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Empty response from provider")]
    EmptyResponse,

    #[error("No API key configured for provider")]
    MissingCredential,

    #[error("JSON parse error: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("{0}")]
    SchemaViolation(String),
}

impl UpstreamError {
    /// Short name of the failure kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Network(_)
            | UpstreamError::Provider { .. }
            | UpstreamError::EmptyResponse
            | UpstreamError::MissingCredential => "provider_unavailable",
            UpstreamError::MalformedOutput(_) => "malformed_output",
            UpstreamError::SchemaViolation(_) => "schema_violation",
        }
    }
}

/// Errors surfaced to callers of the comment endpoint
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Comment cannot be empty")]
    InvalidInput,

    #[error("API error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
