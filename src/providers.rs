//! Upstream provider registry and chain parsing.
//!
//! A chain is an ordered list of `provider:model` entries. At startup the
//! chain is resolved against the configured API keys into the concrete
//! upstream endpoints the relay will waterfall through.

use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("chain entry '{0}' is missing a model (expected provider:model)")]
    MissingModel(String),

    #[error("chain is empty")]
    EmptyChain,

    #[error("no chain entry has a configured API key")]
    NoUsableProviders,

    #[error("custom provider requires CUSTOM_BASE_URL")]
    MissingCustomBaseUrl,
}

/// The upstream providers the relay can forward to.
///
/// All of these speak the OpenAI chat-completions dialect; `Custom` points at
/// any compatible endpoint via `CUSTOM_BASE_URL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Cerebras,
    OpenRouter,
    Groq,
    OpenAi,
    Custom,
}

impl ProviderKind {
    /// Parse a provider ID string (as used in `RELAY_CHAIN`).
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "cerebras" => Some(Self::Cerebras),
            "openrouter" => Some(Self::OpenRouter),
            "groq" => Some(Self::Groq),
            "openai" => Some(Self::OpenAi),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Stable string ID, used for health tracking and logging.
    pub fn id(self) -> &'static str {
        match self {
            Self::Cerebras => "cerebras",
            Self::OpenRouter => "openrouter",
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Custom => "custom",
        }
    }

    /// Default base URL for the provider's OpenAI-compatible API.
    ///
    /// Returns `None` for `Custom`, which uses the configured base URL.
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::Cerebras => Some("https://api.cerebras.ai/v1"),
            Self::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::Custom => None,
        }
    }

    /// Name of the environment variable holding this provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Cerebras => "CEREBRAS_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Custom => "CUSTOM_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A single entry in the fallback chain: provider + model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub provider: ProviderKind,
    pub model: String,
}

/// A resolved chain entry, ready for routing.
#[derive(Debug, Clone)]
pub struct UpstreamEntry {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
}

/// Parse a `RELAY_CHAIN` spec string into chain entries.
///
/// Entries are comma-separated `provider:model` pairs. Whitespace around
/// entries is ignored; a trailing comma is allowed. Unknown providers and
/// entries without a model are hard errors, not silently skipped.
pub fn parse_chain_spec(spec: &str) -> Result<Vec<ChainEntry>, ProviderError> {
    let mut entries = Vec::new();

    for raw in spec.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (provider_id, model) = raw
            .split_once(':')
            .ok_or_else(|| ProviderError::MissingModel(raw.to_string()))?;
        let model = model.trim();
        if model.is_empty() {
            return Err(ProviderError::MissingModel(raw.to_string()));
        }

        let provider = ProviderKind::from_id(provider_id.trim())
            .ok_or_else(|| ProviderError::UnknownProvider(provider_id.trim().to_string()))?;

        entries.push(ChainEntry {
            provider,
            model: model.to_string(),
        });
    }

    if entries.is_empty() {
        return Err(ProviderError::EmptyChain);
    }
    Ok(entries)
}

/// Chat-completions URL for a base URL, with trailing-slash normalization.
pub fn completions_url(base: &str) -> String {
    format!("{}/chat/completions", base.trim_end_matches('/'))
}

/// Resolve the configured chain into concrete upstream entries.
///
/// Entries whose provider has no API key configured are skipped with a
/// warning; an empty result is an error so misconfiguration surfaces at
/// startup rather than on the first request.
pub fn resolve_entries(config: &Config) -> Result<Vec<UpstreamEntry>, ProviderError> {
    let mut resolved = Vec::new();

    for entry in &config.chain {
        let Some(api_key) = config.keys.get(entry.provider) else {
            tracing::warn!(
                provider = %entry.provider,
                env = entry.provider.api_key_env(),
                "Skipping chain entry with no API key"
            );
            continue;
        };

        let base_url = match entry.provider {
            ProviderKind::Custom => config
                .keys
                .custom_base_url
                .clone()
                .ok_or(ProviderError::MissingCustomBaseUrl)?,
            kind => kind
                .default_base_url()
                .expect("non-custom providers have a default base URL")
                .to_string(),
        };

        resolved.push(UpstreamEntry {
            provider: entry.provider,
            model: entry.model.clone(),
            api_key: api_key.to_string(),
            base_url,
        });
    }

    if resolved.is_empty() {
        return Err(ProviderError::NoUsableProviders);
    }
    Ok(resolved)
}
