
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::fallback::pseudo_embedding;
use super::{EmbeddingProvider, Embeddings, ProviderKind, check_dimensions, not_configured};
use crate::config::GoogleConfig;
use crate::http::{ApiClient, endpoint};
use crate::Result;

/// Google-style embedding backend: one request per text, 768 dimensions.
///
/// When any request fails the whole call degrades to deterministic
/// pseudo-embeddings instead of returning an error.
#[derive(Clone)]
pub struct GoogleEmbedder {
    url: Url,
    model: String,
    api_key: Option<String>,
    client: ApiClient,
}

impl std::fmt::Debug for GoogleEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleEmbedder")
            .field("url", &self.url.as_str())
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Model names are addressed as `models/{name}`
pub(crate) fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

impl GoogleEmbedder {
    #[inline]
    pub fn new(config: &GoogleConfig, api_key: Option<String>, client: ApiClient) -> Result<Self> {
        let model = model_path(&config.embedding_model);
        let url = endpoint(&config.base_url, &format!("{model}:embedContent"))?;

        Ok(Self {
            url,
            model,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    fn embed_text(&self, url: &Url, text: &str) -> Result<Vec<f32>> {
        let request = EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
        };

        let response: EmbedContentResponse = self.client.post_json_for(url, &request, None)?;
        Ok(response.embedding.values)
    }

    fn embed_all(&self, api_key: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("key", api_key);

        let vectors = texts
            .iter()
            .map(|text| self.embed_text(&url, text))
            .collect::<Result<Vec<_>>>()?;

        check_dimensions(self.kind(), &vectors)?;
        Ok(vectors)
    }

    fn fallback(&self, texts: &[String]) -> Embeddings {
        let dimension = self.dimension();
        Embeddings::fallback(
            texts
                .iter()
                .map(|text| pseudo_embedding(text, dimension))
                .collect(),
        )
    }
}

impl EmbeddingProvider for GoogleEmbedder {
    #[inline]
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    #[inline]
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Embeddings> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| not_configured(self.kind()))?;

        if texts.is_empty() {
            return Ok(Embeddings::default());
        }

        debug!("Generating Google embeddings for {} texts", texts.len());

        match self.embed_all(api_key, texts) {
            Ok(vectors) => {
                info!("Generated {} Google embeddings", vectors.len());
                Ok(Embeddings::semantic(vectors))
            }
            Err(e) => {
                warn!(
                    "Google embedding API not available ({}), using fallback embeddings for {} texts; similarity results will not be meaningful",
                    e,
                    texts.len()
                );
                Ok(self.fallback(texts))
            }
        }
    }
}
