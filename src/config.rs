//! Configuration management for the relay and its companion tools.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `RELAY_CHAIN` - Optional. Comma-separated `provider:model` fallback chain,
//!   e.g. `cerebras:llama-3.3-70b,openrouter:meta-llama/llama-3.3-70b-instruct`.
//! - `CEREBRAS_API_KEY`, `OPENROUTER_API_KEY`, `GROQ_API_KEY`, `OPENAI_API_KEY` -
//!   Optional. API keys for the corresponding chain providers.
//! - `CUSTOM_API_KEY` / `CUSTOM_BASE_URL` - Optional. Credentials and base URL
//!   for a `custom:` chain entry.
//! - `WORKSPACE_PATH` - Optional. Working directory for agent tools. Defaults to
//!   the current directory.
//! - `DOCS_DIR` - Optional. Output directory for the crawler. Defaults to `.docs`.
//! - `USER_AGENT` - Optional. User-Agent header for outgoing page fetches.
//! - `HTTP_TIMEOUT_SECS` - Optional. Timeout for page fetches. Defaults to `10`.

use std::path::PathBuf;

use thiserror::Error;

use crate::providers::{parse_chain_spec, ChainEntry, ProviderError, ProviderKind};

/// Fallback chain used when `RELAY_CHAIN` is not set.
pub const DEFAULT_CHAIN: &str =
    "cerebras:llama-3.3-70b,openrouter:meta-llama/llama-3.3-70b-instruct";

const DEFAULT_USER_AGENT: &str =
    concat!("agent-relay/", env!("CARGO_PKG_VERSION"), " (web, cli, and code agent)");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Invalid RELAY_CHAIN: {0}")]
    InvalidChain(#[from] ProviderError),
}

/// API keys for the supported upstream providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub cerebras: Option<String>,
    pub openrouter: Option<String>,
    pub groq: Option<String>,
    pub openai: Option<String>,
    pub custom: Option<String>,

    /// Base URL for the `custom` provider (required for custom entries).
    pub custom_base_url: Option<String>,
}

impl ProviderKeys {
    /// Look up the configured key for a provider kind.
    pub fn get(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Cerebras => self.cerebras.as_deref(),
            ProviderKind::OpenRouter => self.openrouter.as_deref(),
            ProviderKind::Groq => self.groq.as_deref(),
            ProviderKind::OpenAi => self.openai.as_deref(),
            ProviderKind::Custom => self.custom.as_deref(),
        }
    }

    fn from_env() -> Self {
        Self {
            cerebras: std::env::var("CEREBRAS_API_KEY").ok(),
            openrouter: std::env::var("OPENROUTER_API_KEY").ok(),
            groq: std::env::var("GROQ_API_KEY").ok(),
            openai: std::env::var("OPENAI_API_KEY").ok(),
            custom: std::env::var("CUSTOM_API_KEY").ok(),
            custom_base_url: std::env::var("CUSTOM_BASE_URL").ok(),
        }
    }
}

/// Relay and agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Ordered provider fallback chain
    pub chain: Vec<ChainEntry>,

    /// Upstream API keys
    pub keys: ProviderKeys,

    /// Working directory for agent tool execution
    pub workspace_path: PathBuf,

    /// Output directory for crawled markdown
    pub docs_dir: PathBuf,

    /// User-Agent for outgoing page fetches
    pub user_agent: String,

    /// Timeout for page fetches, in seconds
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidChain` if `RELAY_CHAIN` does not parse, or
    /// `ConfigError::InvalidValue` for malformed numeric values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let chain_spec = std::env::var("RELAY_CHAIN").unwrap_or_else(|_| DEFAULT_CHAIN.to_string());
        let chain = parse_chain_spec(&chain_spec)?;

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let docs_dir = std::env::var("DOCS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".docs"));

        let user_agent =
            std::env::var("USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let http_timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("HTTP_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            host,
            port,
            chain,
            keys: ProviderKeys::from_env(),
            workspace_path,
            docs_dir,
            user_agent,
            http_timeout_secs,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(chain: Vec<ChainEntry>, keys: ProviderKeys, workspace_path: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            chain,
            keys,
            workspace_path,
            docs_dir: PathBuf::from(".docs"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_parses() {
        let chain = parse_chain_spec(DEFAULT_CHAIN).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].provider, ProviderKind::Cerebras);
        assert_eq!(chain[1].provider, ProviderKind::OpenRouter);
    }

    #[test]
    fn keys_lookup_by_kind() {
        let keys = ProviderKeys {
            cerebras: Some("csk-123".to_string()),
            ..Default::default()
        };
        assert_eq!(keys.get(ProviderKind::Cerebras), Some("csk-123"));
        assert_eq!(keys.get(ProviderKind::Groq), None);
    }
}
