
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{EmbeddingProvider, Embeddings, ProviderKind, check_dimensions, not_configured};
use crate::config::OpenAiConfig;
use crate::http::{ApiClient, endpoint};
use crate::{RagError, Result};

/// Largest number of inputs accepted by one embeddings request
pub const MAX_BATCH_SIZE: u32 = 100;

/// OpenAI-style embedding backend: batched requests, 1536 dimensions
#[derive(Clone)]
pub struct OpenAiEmbedder {
    url: Url,
    model: String,
    batch_size: usize,
    api_key: Option<String>,
    client: ApiClient,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("url", &self.url.as_str())
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedder {
    #[inline]
    pub fn new(config: &OpenAiConfig, api_key: Option<String>, client: ApiClient) -> Result<Self> {
        let url = endpoint(&config.base_url, "embeddings")?;

        Ok(Self {
            url,
            model: config.embedding_model.clone(),
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE) as usize,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    fn embed_batch(&self, api_key: &str, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: batch,
        };

        let response: EmbeddingResponse =
            self.client
                .post_json_for(&self.url, &request, Some(api_key))
                .map_err(|e| match e {
                    RagError::Provider(_) => e,
                    other => RagError::Provider(format!("OpenAI embedding request failed: {other}")),
                })?;

        if response.data.len() != batch.len() {
            return Err(RagError::Provider(format!(
                "Mismatch between request and response counts: {} vs {}",
                batch.len(),
                response.data.len()
            )));
        }

        let mut ordered: Vec<Option<Vec<f32>>> = vec![None; batch.len()];
        for item in response.data {
            let slot = ordered.get_mut(item.index).ok_or_else(|| {
                RagError::Provider(format!("Response index {} out of range", item.index))
            })?;
            if slot.replace(item.embedding).is_some() {
                return Err(RagError::Provider(format!(
                    "Duplicate response index {}",
                    item.index
                )));
            }
        }

        // Every slot is filled: the counts match and no index repeated
        Ok(ordered.into_iter().flatten().collect())
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    #[inline]
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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

        debug!(
            "Generating OpenAI embeddings for {} texts in batches of {}",
            texts.len(),
            self.batch_size
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_number, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!("Embedding batch {} ({} texts)", batch_number + 1, batch.len());
            vectors.extend(self.embed_batch(api_key, batch)?);
        }

        check_dimensions(self.kind(), &vectors)?;

        info!("Generated {} OpenAI embeddings", vectors.len());
        Ok(Embeddings::semantic(vectors))
    }
}
