use tracing::debug;

use crate::config::Config;
use crate::embeddings::ProviderKind;

/// API keys for the two providers, read once from the environment.
///
/// A key that is unset or blank counts as missing, so callers can tell an
/// unconfigured provider apart before any request is attempted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    openai_api_key: Option<String>,
    gemini_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    #[inline]
    pub fn new(openai_api_key: Option<String>, gemini_api_key: Option<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.filter(|k| !k.trim().is_empty()),
            gemini_api_key: gemini_api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Read keys from the environment variables named in the config
    #[inline]
    pub fn from_env(config: &Config) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    #[inline]
    pub fn from_lookup<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Self::new(
            lookup(&config.openai.api_key_env),
            lookup(&config.google.api_key_env),
        );

        debug!(
            "Loaded credentials: openai configured={}, google configured={}",
            credentials.is_configured(ProviderKind::OpenAi),
            credentials.is_configured(ProviderKind::Google)
        );

        credentials
    }

    #[inline]
    pub fn api_key(&self, provider: ProviderKind) -> Option<&str> {
        match provider {
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ProviderKind::Google => self.gemini_api_key.as_deref(),
        }
    }

    #[inline]
    pub fn is_configured(&self, provider: ProviderKind) -> bool {
        self.api_key(provider).is_some()
    }
}
