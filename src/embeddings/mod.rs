// Embeddings module
// Provider abstraction over the OpenAI-style and Google-style embedding backends,
// plus the word-window chunker that feeds them

pub mod chunking;
pub mod fallback;
pub mod google;
pub mod openai;


use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, Credentials};
use crate::http::ApiClient;
use crate::{RagError, Result};

pub use chunking::{Chunk, Chunker, ChunkingConfig};
pub use google::GoogleEmbedder;
pub use openai::OpenAiEmbedder;

/// Which embedding space a document lives in.
///
/// The dimension is a fixed property of the provider and is never configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "google")]
    Google,
}

impl ProviderKind {
    #[inline]
    pub const fn dimension(self) -> usize {
        match self {
            Self::OpenAi => 1536,
            Self::Google => 768,
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Google => "google",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = RagError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "google" | "gemini" => Ok(Self::Google),
            other => Err(RagError::Config(format!("Unknown provider: {other}"))),
        }
    }
}

/// Whether vectors carry real semantic meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingMode {
    #[default]
    Semantic,
    /// Deterministic pseudo-embeddings; similarity rankings are meaningless
    Fallback,
}

/// Output of one `embed` call: one row per input text, in input order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Embeddings {
    pub vectors: Vec<Vec<f32>>,
    pub mode: EmbeddingMode,
}

impl Embeddings {
    #[inline]
    pub fn semantic(vectors: Vec<Vec<f32>>) -> Self {
        Self {
            vectors,
            mode: EmbeddingMode::Semantic,
        }
    }

    #[inline]
    pub fn fallback(vectors: Vec<Vec<f32>>) -> Self {
        Self {
            vectors,
            mode: EmbeddingMode::Fallback,
        }
    }

    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.mode == EmbeddingMode::Fallback
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Converts text into fixed-dimension vectors
pub trait EmbeddingProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    #[inline]
    fn dimension(&self) -> usize {
        self.kind().dimension()
    }

    /// Whether the backend credential is present
    fn is_configured(&self) -> bool;

    /// Embed `texts`, returning a `texts.len() x dimension` matrix.
    ///
    /// Fails with [`RagError::Provider`] before any network call when the
    /// provider is not configured.
    fn embed(&self, texts: &[String]) -> Result<Embeddings>;

    /// Embed a single text, typically a query
    #[inline]
    fn embed_one(&self, text: &str) -> Result<(Vec<f32>, EmbeddingMode)> {
        let embeddings = self.embed(&[text.to_string()])?;
        let mode = embeddings.mode;
        let vector = embeddings
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Provider("Provider returned no embedding".to_string()))?;
        Ok((vector, mode))
    }
}

/// Error returned by every provider whose credential was never supplied
#[inline]
pub fn not_configured(provider: ProviderKind) -> RagError {
    RagError::Provider(format!("{provider} not configured"))
}

/// Verify that every vector has the provider's dimension
pub(crate) fn check_dimensions(provider: ProviderKind, vectors: &[Vec<f32>]) -> Result<()> {
    let expected = provider.dimension();
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(RagError::Provider(format!(
            "{provider} returned a {}-dimensional embedding, expected {expected}",
            bad.len()
        )));
    }
    Ok(())
}

/// Builds the provider recorded for a document
pub trait ProviderFactory {
    fn create(&self, kind: ProviderKind) -> Result<Box<dyn EmbeddingProvider>>;
}

/// Builds real HTTP-backed providers from settings and credentials
#[derive(Debug, Clone)]
pub struct ConfiguredProviders {
    config: Config,
    credentials: Credentials,
}

impl ConfiguredProviders {
    #[inline]
    pub fn new(config: Config, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    #[inline]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl ProviderFactory for ConfiguredProviders {
    fn create(&self, kind: ProviderKind) -> Result<Box<dyn EmbeddingProvider>> {
        debug!("Creating {} embedding provider", kind);

        let client = ApiClient::new(&self.config.http);
        let api_key = self.credentials.api_key(kind).map(str::to_string);

        let provider: Box<dyn EmbeddingProvider> = match kind {
            ProviderKind::OpenAi => Box::new(OpenAiEmbedder::new(
                &self.config.openai,
                api_key,
                client,
            )?),
            ProviderKind::Google => Box::new(GoogleEmbedder::new(
                &self.config.google,
                api_key,
                client,
            )?),
        };

        Ok(provider)
    }
}
