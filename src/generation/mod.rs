// Answer generation backends

pub mod gemini;
pub mod openai;


use tracing::debug;

use crate::Result;
use crate::config::{Config, Credentials};
use crate::embeddings::{ProviderKind, not_configured};
use crate::http::ApiClient;

pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;

/// Turns grounded instructions and a question into answer text
pub trait Generator: Send + Sync {
    /// Returns the model's reply, which may be empty
    fn generate(&self, system_instructions: &str, user_query: &str) -> Result<String>;
}

/// Build the generator paired with `kind`, failing early without a credential
#[inline]
pub fn create_generator(
    kind: ProviderKind,
    config: &Config,
    credentials: &Credentials,
) -> Result<Box<dyn Generator>> {
    let api_key = credentials
        .api_key(kind)
        .ok_or_else(|| not_configured(kind))?
        .to_string();
    let client = ApiClient::new(&config.http);

    debug!("Creating {} generator", kind);

    Ok(match kind {
        ProviderKind::OpenAi => Box::new(OpenAiGenerator::new(&config.openai, api_key, client)?),
        ProviderKind::Google => Box::new(GeminiGenerator::new(&config.google, api_key, client)?),
    })
}
