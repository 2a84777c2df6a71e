//! Configuration management

use anyhow::Context;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Default port when neither config nor `PORT` sets one
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Cross-origin policy
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Cross-origin policy. `"*"` in a list permits anything.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "wildcard")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "wildcard")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "wildcard")]
    pub allowed_headers: Vec<String>,
}

#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    /// LLM provider (groq, openai, ollama, compatible)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name, provider default when unset
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout; no timeout when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_provider() -> String {
    "groq".to_string()
}

fn wildcard() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: wildcard(),
            allowed_methods: wildcard(),
            allowed_headers: wildcard(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: None,
        }
    }
}

// Keep the key out of logs
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from an optional file, `.env` and the environment
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                let expanded = shellexpand::tilde(path);
                builder = builder.add_source(File::with_name(&expanded));
            }
            None => {
                if let Some(found) = Self::find_default() {
                    tracing::debug!("Using config file {}", found);
                    builder = builder.add_source(File::with_name(&found));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SENTIMENT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors.allowed_origins")
                .with_list_parse_key("server.cors.allowed_methods")
                .with_list_parse_key("server.cors.allowed_headers")
                .try_parsing(true),
        );

        let port = std::env::var("PORT").ok();
        let api_key = std::env::var("GROQ_API_KEY").ok();
        Self::finish(builder, api_key, port)
    }

    /// Build from an in-memory TOML document, without consulting the environment
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let builder = config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder, None, None)
    }

    fn find_default() -> Option<String> {
        let paths = [
            "config.toml",
            "config.yaml",
            "~/.config/sentiment-api/config.toml",
        ];

        paths
            .iter()
            .map(|p| shellexpand::tilde(p).into_owned())
            .find(|p| Path::new(p).exists())
    }

    /// Apply the conventional `GROQ_API_KEY` / `PORT` variables on top of everything else
    fn finish(
        builder: ConfigBuilder<DefaultState>,
        api_key: Option<String>,
        port: Option<String>,
    ) -> anyhow::Result<Self> {
        let port = port
            .map(|p| p.trim().parse::<u16>().with_context(|| format!("invalid PORT: {p}")))
            .transpose()?;
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        let settings = builder
            .set_override_option("server.port", port.map(i64::from))?
            .set_override_option("llm.api_key", api_key)?
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.cors.allowed_origins, vec!["*"]);
        assert_eq!(config.llm.provider, "groq");
        assert!(config.llm.api_key.is_none());
        assert!(config.llm.timeout_secs.is_none());
    }

    #[test]
    fn test_file_values() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9100

            [server.cors]
            allowed_origins = ["https://example.com"]

            [llm]
            provider = "openai"
            model = "gpt-4o"
            timeout_secs = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.addr(), "0.0.0.0:9100");
        assert_eq!(config.server.cors.allowed_origins, vec!["https://example.com"]);
        assert_eq!(config.server.cors.allowed_methods, vec!["*"]);
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.llm.timeout_secs, Some(20));
    }

    #[test]
    fn test_conventional_overrides() {
        let builder = config::Config::builder()
            .add_source(File::from_str("[server]\nport = 9100", FileFormat::Toml));
        let config = Config::finish(builder, Some("gsk_test".into()), Some("8123".into())).unwrap();
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.llm.api_key.as_deref(), Some("gsk_test"));
    }

    #[test]
    fn test_blank_api_key_ignored() {
        let config = Config::finish(config::Config::builder(), Some("  ".into()), None).unwrap();
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let result = Config::finish(config::Config::builder(), None, Some("eighty".into()));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let llm = LlmConfig {
            api_key: Some("gsk_secret".into()),
            ..LlmConfig::default()
        };
        let debug = format!("{:?}", llm);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("redacted"));
    }
}
