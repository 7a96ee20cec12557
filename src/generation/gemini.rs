use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::Generator;
use crate::config::GoogleConfig;
use crate::embeddings::google::model_path;
use crate::http::{ApiClient, endpoint};
use crate::{RagError, Result};

/// `generateContent` client; instructions and question travel as one prompt
#[derive(Clone)]
pub struct GeminiGenerator {
    url: Url,
    model: String,
    api_key: String,
    client: ApiClient,
}

impl std::fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("url", &self.url.as_str())
            .field("model", &self.model)
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiGenerator {
    #[inline]
    pub fn new(config: &GoogleConfig, api_key: String, client: ApiClient) -> Result<Self> {
        let model = model_path(&config.chat_model);
        let url = endpoint(&config.base_url, &format!("{model}:generateContent"))?;

        Ok(Self {
            url,
            model,
            api_key,
            client,
        })
    }
}

impl Generator for GeminiGenerator {
    #[inline]
    fn generate(&self, system_instructions: &str, user_query: &str) -> Result<String> {
        let prompt = format!("{system_instructions}\n\n{user_query}");
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: &prompt }],
            }],
        };

        debug!("Requesting content generation from {}", self.model);

        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response: GenerateResponse = self.client.post_json_for(&url, &request, None)?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            RagError::Provider("No candidates returned from Gemini API".to_string())
        })?;

        Ok(candidate.content.map_or_else(String::new, |content| {
            content.parts.into_iter().filter_map(|part| part.text).collect()
        }))
    }
}
