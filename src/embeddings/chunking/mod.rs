#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;

/// Approximate tokens per whitespace-delimited word
pub const TOKENS_PER_WORD: f64 = 1.3;

/// A contiguous word window of a document, individually embeddable and citable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The window's words joined by single spaces
    pub text: String,
    /// Dense 0-based id; also the row of this chunk's vector in the index
    pub chunk_id: usize,
    /// Index of the first word in the window
    pub start_word: usize,
    /// One past the last word in the window
    pub end_word: usize,
    pub word_count: usize,
}

/// Configuration for word-window chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in tokens
    pub chunk_size_tokens: usize,
    /// Overlap between adjacent windows in tokens
    pub chunk_overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size_tokens: 500,
            chunk_overlap_tokens: 50,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn window_words(&self) -> usize {
        tokens_to_words(self.chunk_size_tokens)
    }

    #[inline]
    pub fn overlap_words(&self) -> usize {
        tokens_to_words(self.chunk_overlap_tokens)
    }

    #[inline]
    pub fn stride_words(&self) -> usize {
        self.window_words().saturating_sub(self.overlap_words())
    }

    /// Reject settings whose windows would not advance through the text
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size_tokens <= self.chunk_overlap_tokens || self.stride_words() == 0 {
            return Err(ConfigError::InvalidChunkSizes {
                size: self.chunk_size_tokens,
                overlap: self.chunk_overlap_tokens,
            });
        }
        Ok(())
    }
}

/// Convert a token budget to whole words, flooring `tokens / 1.3`.
///
/// Uses the fmod-based floor division of float `//` so that e.g. 13 tokens
/// maps to 9 words, matching indexes built by earlier releases.
fn tokens_to_words(tokens: usize) -> usize {
    let tokens = tokens as f64;
    let remainder = tokens % TOKENS_PER_WORD;
    let div = (tokens - remainder) / TOKENS_PER_WORD;
    let floor = div.floor();
    let words = if div - floor > 0.5 { floor + 1.0 } else { floor };
    words as usize
}

/// Splits text into overlapping word windows
#[derive(Debug, Clone)]
pub struct Chunker {
    window: usize,
    stride: usize,
}

impl Chunker {
    /// Validates the configuration once; `chunk` itself never fails
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            window: config.window_words(),
            stride: config.stride_words(),
        })
    }

    #[inline]
    pub fn window_words(&self) -> usize {
        self.window
    }

    #[inline]
    pub fn stride_words(&self) -> usize {
        self.stride
    }

    /// Chunk `text` into windows starting at 0, stride, 2*stride, ...
    ///
    /// Text without words yields an empty vec; callers decide how to report it.
    #[inline]
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::with_capacity(words.len() / self.stride + 1);

        for start in (0..words.len()).step_by(self.stride) {
            let end = (start + self.window).min(words.len());
            let window = &words[start..end];
            let chunk_text = window.join(" ");

            if chunk_text.trim().is_empty() {
                continue;
            }

            chunks.push(Chunk {
                text: chunk_text,
                chunk_id: chunks.len(),
                start_word: start,
                end_word: end,
                word_count: window.len(),
            });
        }

        debug!(
            "Chunked {} words into {} chunks (window {}, stride {})",
            words.len(),
            chunks.len(),
            self.window,
            self.stride
        );

        chunks
    }
}
