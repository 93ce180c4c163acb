//! Classifier provider selection and credential lookup.
//!
//! Keys are managed outside this crate. A [`CredentialSource`] is read once
//! per request; a missing key is a [`SieveError::Config`] that the client
//! never retries.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};

/// Environment variable naming the provider for [`EnvCredentials`].
pub const ENV_PROVIDER: &str = "SERP_SIEVE_PROVIDER";
/// Environment variable naming the model for [`EnvCredentials`].
pub const ENV_MODEL: &str = "SERP_SIEVE_MODEL";
/// Environment variable holding the API key for [`EnvCredentials`].
pub const ENV_API_KEY: &str = "SERP_SIEVE_API_KEY";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Supported classifier providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat completions.
    OpenAi,
    /// OpenRouter gateway (OpenAI-compatible).
    OpenRouter,
    /// SiliconFlow (OpenAI-compatible).
    #[default]
    SiliconFlow,
    /// Anthropic Messages API.
    Claude,
}

impl Provider {
    /// Stable lowercase identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::SiliconFlow => "siliconflow",
            Self::Claude => "claude",
        }
    }

    /// Parse a provider identifier, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`SieveError::Config`] for an unknown provider.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "siliconflow" => Ok(Self::SiliconFlow),
            "claude" | "anthropic" => Ok(Self::Claude),
            other => Err(SieveError::Config(format!("unknown provider: {other}"))),
        }
    }

    /// API root for this provider, without a trailing slash.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::SiliconFlow => "https://api.siliconflow.com/v1",
            Self::Claude => "https://api.anthropic.com/v1",
        }
    }

    /// Whether the provider speaks the OpenAI chat-completions format.
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, Self::Claude)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Provider settings as read from the credential source.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Selected provider.
    pub provider: Provider,
    /// Model identifier passed to the provider.
    pub model: String,
    /// API key, if one is configured.
    pub api_key: Option<String>,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProviderCredentials {
    /// Credentials with a key set.
    pub fn new(provider: Provider, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: Some(api_key.into()),
        }
    }

    /// Require a non-blank API key.
    ///
    /// # Errors
    ///
    /// Returns [`SieveError::Config`] when the key is absent or blank.
    pub fn authorize(self) -> Result<ApiCredentials> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                SieveError::Config(format!("api key missing for provider {}", self.provider))
            })?;
        if self.model.trim().is_empty() {
            return Err(SieveError::Config(format!(
                "model missing for provider {}",
                self.provider
            )));
        }
        Ok(ApiCredentials {
            provider: self.provider,
            model: self.model,
            api_key,
        })
    }
}

/// Credentials with a key known to be present.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    /// Selected provider.
    pub provider: Provider,
    /// Model identifier.
    pub model: String,
    /// API key.
    pub api_key: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Read access to the active provider settings.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Current provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`SieveError::Config`] if the settings cannot be read.
    async fn credentials(&self) -> Result<ProviderCredentials>;
}

/// Fixed credentials, mainly for tests and embedding.
#[derive(Debug, Clone)]
pub struct StaticCredentials(ProviderCredentials);

impl StaticCredentials {
    /// Serve `credentials` on every call.
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self(credentials)
    }

    /// Credentials with no API key.
    pub fn missing_key(provider: Provider) -> Self {
        Self(ProviderCredentials {
            provider,
            model: DEFAULT_MODEL.to_owned(),
            api_key: None,
        })
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn credentials(&self) -> Result<ProviderCredentials> {
        Ok(self.0.clone())
    }
}

/// Reads [`ENV_PROVIDER`], [`ENV_MODEL`] and [`ENV_API_KEY`] on each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<ProviderCredentials> {
        let provider = match lookup(ENV_PROVIDER) {
            Some(name) if !name.trim().is_empty() => Provider::from_name(&name)?,
            _ => Provider::default(),
        };
        let model = lookup(ENV_MODEL)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        Ok(ProviderCredentials {
            provider,
            model,
            api_key: lookup(ENV_API_KEY),
        })
    }
}

#[async_trait]
impl CredentialSource for EnvCredentials {
    async fn credentials(&self) -> Result<ProviderCredentials> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}
