// Retrieval-augmented answering over one document

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::config::ConfigError;
use crate::database::DocumentStore;
use crate::embeddings::Chunk;
use crate::generation::Generator;

/// Reply used when retrieval finds nothing to ground an answer
pub const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find relevant information in the document to answer your question.";

/// Reply used when the generator returns no text
pub const NO_RESPONSE_GENERATED: &str = "No response generated.";

const SOURCE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Prior messages included with follow-up questions
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 5,
            history_turns: 5,
        }
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        if self.history_turns > 50 {
            return Err(ConfigError::InvalidHistoryTurns(self.history_turns));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ChatMessage {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
    /// Number of chunks placed in the prompt
    pub context_used: usize,
    /// Retrieval ran on fallback embeddings
    pub degraded: bool,
}

impl Answer {
    fn message(text: impl Into<String>) -> Self {
        Self {
            answer: text.into(),
            ..Self::default()
        }
    }

    /// User-facing reply for a question that could not be answered
    #[inline]
    pub fn apology(reason: impl std::fmt::Display) -> Self {
        Self::message(format!(
            "I encountered an error while processing your question: {reason}"
        ))
    }
}

/// Citation line for a retrieved chunk
#[inline]
pub fn format_source(chunk: &Chunk, score: f32) -> String {
    let preview: String = chunk.text.chars().take(SOURCE_PREVIEW_CHARS).collect();
    format!(
        "Chunk {}: \"{}...\" (Relevance: {:.2})",
        chunk.chunk_id, preview, score
    )
}

/// Render the last `turns` messages as `User:` / `Assistant:` lines
#[inline]
pub fn render_history(history: &[ChatMessage], turns: usize) -> String {
    let start = history.len().saturating_sub(turns);
    let mut rendered = String::new();
    for message in &history[start..] {
        rendered.push_str(match message.role {
            Role::User => "User: ",
            Role::Assistant => "Assistant: ",
        });
        rendered.push_str(&message.content);
        rendered.push('\n');
    }
    rendered
}

/// System instructions for a first question
#[inline]
pub fn question_prompt(document_name: &str, context: &str) -> String {
    format!(
        r#"You are an AI assistant helping users understand a document titled "{document_name}".

You will be provided with relevant excerpts from the document and a user question. Your task is to:
1. Answer the question based ONLY on the provided context
2. Be accurate and specific
3. If the context doesn't contain enough information to answer the question, say so clearly
4. Cite specific parts of the context when possible
5. Keep your answer concise but comprehensive

Document context:
{context}

Remember: Only use information from the provided context. Do not add information from your general knowledge."#
    )
}

/// System instructions for a question asked after earlier turns
#[inline]
pub fn follow_up_prompt(document_name: &str, history: &str, context: &str) -> String {
    format!(
        r#"You are an AI assistant helping users understand a document titled "{document_name}".

Previous conversation:
{history}

Current document context:
{context}

Answer the user's follow-up question based ONLY on the document context and previous conversation. If the context doesn't contain enough information, say so clearly. Cite specific parts of the context when possible and keep your answer concise. Maintain consistency with previous responses while providing accurate information from the document."#
    )
}

/// Retrieves context from a document and asks the generator to answer
pub struct Orchestrator {
    generator: Box<dyn Generator>,
    config: RetrievalConfig,
}

impl Orchestrator {
    #[inline]
    pub fn new(generator: Box<dyn Generator>, config: RetrievalConfig) -> Self {
        Self { generator, config }
    }

    #[inline]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Answer `query` from `store`; failures become an apology, never an `Err`
    #[inline]
    pub fn answer(&self, query: &str, store: &DocumentStore, history: &[ChatMessage]) -> Answer {
        match self.try_answer(query, store, history) {
            Ok(answer) => answer,
            Err(e) => {
                error!("Failed to answer question: {}", e);
                Answer::apology(e)
            }
        }
    }

    fn try_answer(
        &self,
        query: &str,
        store: &DocumentStore,
        history: &[ChatMessage],
    ) -> Result<Answer> {
        let outcome = store.search(query, self.config.top_k)?;

        if outcome.degraded {
            warn!("Answering from fallback embeddings; retrieved context may be unrelated");
        }

        if outcome.hits.is_empty() {
            info!("No relevant chunks found for question");
            return Ok(Answer {
                degraded: outcome.degraded,
                ..Answer::message(NO_RELEVANT_INFORMATION)
            });
        }

        let context = outcome
            .hits
            .iter()
            .map(|(chunk, _)| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let sources: Vec<String> = outcome
            .hits
            .iter()
            .map(|(chunk, score)| format_source(chunk, *score))
            .collect();

        let document_name = store.document_name();
        let (system, user) = if history.is_empty() {
            (
                question_prompt(document_name, &context),
                format!("Question: {query}"),
            )
        } else {
            let rendered = render_history(history, self.config.history_turns);
            (
                follow_up_prompt(document_name, &rendered, &context),
                format!("Follow-up question: {query}"),
            )
        };

        debug!(
            "Generating answer from {} chunks ({} history messages)",
            outcome.hits.len(),
            history.len().min(self.config.history_turns)
        );

        let reply = self.generator.generate(&system, &user)?;
        let answer = if reply.trim().is_empty() {
            NO_RESPONSE_GENERATED.to_string()
        } else {
            reply
        };

        Ok(Answer {
            answer,
            context_used: outcome.hits.len(),
            sources,
            degraded: outcome.degraded,
        })
    }
}
