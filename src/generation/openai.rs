use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::Generator;
use crate::config::OpenAiConfig;
use crate::http::{ApiClient, endpoint};
use crate::{RagError, Result};

/// Chat-completions client for OpenAI-compatible APIs
#[derive(Clone)]
pub struct OpenAiGenerator {
    url: Url,
    model: String,
    max_tokens: u32,
    temperature: f32,
    api_key: String,
    client: ApiClient,
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("url", &self.url.as_str())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiGenerator {
    #[inline]
    pub fn new(config: &OpenAiConfig, api_key: String, client: ApiClient) -> Result<Self> {
        Ok(Self {
            url: endpoint(&config.base_url, "chat/completions")?,
            model: config.chat_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            api_key,
            client,
        })
    }
}

impl Generator for OpenAiGenerator {
    #[inline]
    fn generate(&self, system_instructions: &str, user_query: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_instructions,
                },
                ChatMessage {
                    role: "user",
                    content: user_query,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!("Requesting chat completion from {}", self.model);

        let response: ChatResponse =
            self.client
                .post_json_for(&self.url, &request, Some(&self.api_key))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Provider("No choices returned from OpenAI API".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
