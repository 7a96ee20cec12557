// In-process doubles for the network-backed seams

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::embeddings::{
    EmbeddingProvider, Embeddings, ProviderFactory, ProviderKind, not_configured,
};
use crate::generation::Generator;
use crate::{RagError, Result};

/// Bag-of-words embedder: each lowercase word bumps one hashed component.
///
/// Texts sharing words score higher, which is enough to exercise ranking.
#[derive(Debug, Clone)]
pub struct KeywordEmbedder {
    kind: ProviderKind,
    configured: bool,
    degraded: bool,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl KeywordEmbedder {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            configured: true,
            degraded: false,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Shared counter of `embed` calls that reached the backend
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let dimension = self.kind.dimension();
        let mut vector = vec![0.0; dimension];
        for word in text.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            let bucket = word
                .bytes()
                .fold(7_usize, |h, b| h.wrapping_mul(31).wrapping_add(usize::from(b)));
            vector[bucket % dimension] += 1.0;
        }
        vector
    }
}

impl EmbeddingProvider for KeywordEmbedder {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn embed(&self, texts: &[String]) -> Result<Embeddings> {
        if !self.configured {
            return Err(not_configured(self.kind));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::Provider("embedding backend unavailable".to_string()));
        }
        let vectors = texts.iter().map(|t| self.vector(t)).collect();
        Ok(if self.degraded {
            Embeddings::fallback(vectors)
        } else {
            Embeddings::semantic(vectors)
        })
    }
}

/// Factory handing out [`KeywordEmbedder`]s and recording requested kinds
#[derive(Debug, Default)]
pub struct KeywordFactory {
    pub requested: Mutex<Vec<ProviderKind>>,
    pub unconfigured: bool,
}

impl ProviderFactory for KeywordFactory {
    fn create(&self, kind: ProviderKind) -> Result<Box<dyn EmbeddingProvider>> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(kind);
        }
        let embedder = KeywordEmbedder::new(kind);
        Ok(Box::new(if self.unconfigured {
            embedder.unconfigured()
        } else {
            embedder
        }))
    }
}

/// Prompt pair seen by a [`ScriptedGenerator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Generator returning a fixed reply and recording every prompt
#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    reply: std::result::Result<String, String>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Arc<Mutex<Vec<Prompt>>> {
        Arc::clone(&self.prompts)
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, system_instructions: &str, user_query: &str) -> Result<String> {
        self.prompts.lock().expect("prompt log").push(Prompt {
            system: system_instructions.to_string(),
            user: user_query.to_string(),
        });
        self.reply.clone().map_err(RagError::Provider)
    }
}
