
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, Credentials};
use crate::embeddings::ProviderKind;
use crate::embeddings::chunking::ChunkingConfig;

const PROVIDERS: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Google];

#[inline]
pub fn run_interactive_config(mut config: Config) -> Result<()> {
    eprintln!("{}", style("🔧 Doc RAG Configuration Setup").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("New uploads are embedded with this provider. Existing documents keep theirs.");
    eprintln!();

    configure_provider(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Chunking").bold().yellow());
    configure_chunking(&mut config.chunking)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    config.retrieval.top_k = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 50")
            }
        })
        .interact_text()?;

    eprintln!();
    eprintln!("{}", style("Checking credentials...").yellow());

    let credentials = Credentials::from_env(&config);
    let key_env = match config.provider {
        ProviderKind::OpenAi => &config.openai.api_key_env,
        ProviderKind::Google => &config.google.api_key_env,
    };
    if credentials.is_configured(config.provider) {
        eprintln!("{}", style(format!("✓ {} is set", key_env)).green());
    } else {
        eprintln!(
            "{}",
            style(format!("⚠ Warning: {} is not set", key_env)).yellow()
        );
        eprintln!("You can continue, but set the key before uploading or asking questions.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    let credentials = Credentials::from_env(config);

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Provider:").bold().yellow());
    eprintln!("  Default: {}", style(config.provider).cyan());
    eprintln!();

    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.openai.base_url).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());
    eprintln!("  Batch Size: {}", style(config.openai.batch_size).cyan());
    eprintln!(
        "  API Key ({}): {}",
        config.openai.api_key_env,
        style(key_status(&credentials, ProviderKind::OpenAi)).cyan()
    );
    eprintln!();

    eprintln!("{}", style("Google Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.google.base_url).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.google.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.google.chat_model).cyan());
    eprintln!(
        "  API Key ({}): {}",
        config.google.api_key_env,
        style(key_status(&credentials, ProviderKind::Google)).cyan()
    );
    eprintln!();

    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!(
        "  Chunk Size: {} tokens ({} words)",
        style(config.chunking.chunk_size_tokens).cyan(),
        config.chunking.window_words()
    );
    eprintln!(
        "  Overlap: {} tokens ({} words)",
        style(config.chunking.chunk_overlap_tokens).cyan(),
        config.chunking.overlap_words()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn key_status(credentials: &Credentials, provider: ProviderKind) -> &'static str {
    if credentials.is_configured(provider) {
        "set"
    } else {
        "missing"
    }
}

fn provider_index(provider: ProviderKind) -> usize {
    PROVIDERS.iter().position(|&p| p == provider).unwrap_or(0)
}

fn configure_provider(config: &mut Config) -> Result<()> {
    let labels: Vec<String> = PROVIDERS
        .iter()
        .map(|p| format!("{} ({} dimensions)", p, p.dimension()))
        .collect();

    let selected = Select::new()
        .with_prompt("Embedding provider")
        .default(provider_index(config.provider))
        .items(&labels)
        .interact()?;

    config.provider = PROVIDERS[selected];

    match config.provider {
        ProviderKind::OpenAi => {
            let model: String = Input::new()
                .with_prompt("OpenAI chat model")
                .default(config.openai.chat_model.clone())
                .interact_text()?;
            config.openai.set_chat_model(model)?;

            let batch_size: u32 = Input::new()
                .with_prompt("Embedding batch size")
                .default(config.openai.batch_size)
                .validate_with(|input: &u32| -> Result<(), &str> {
                    if *input == 0 {
                        Err("Batch size must be greater than 0")
                    } else if *input > 100 {
                        Err("Batch size must be 100 or less")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()?;
            config.openai.set_batch_size(batch_size)?;
        }
        ProviderKind::Google => {
            let model: String = Input::new()
                .with_prompt("Gemini chat model")
                .default(config.google.chat_model.clone())
                .interact_text()?;
            config.google.set_chat_model(model)?;
        }
    }

    Ok(())
}

fn configure_chunking(chunking: &mut ChunkingConfig) -> Result<()> {
    let size: usize = Input::new()
        .with_prompt("Chunk size (tokens)")
        .default(chunking.chunk_size_tokens)
        .interact_text()?;

    let overlap: usize = Input::new()
        .with_prompt("Chunk overlap (tokens)")
        .default(chunking.chunk_overlap_tokens)
        .validate_with(|input: &usize| -> Result<(), String> {
            ChunkingConfig {
                chunk_size_tokens: size,
                chunk_overlap_tokens: *input,
            }
            .validate()
            .map_err(|e| e.to_string())
        })
        .interact_text()?;

    chunking.chunk_size_tokens = size;
    chunking.chunk_overlap_tokens = overlap;
    Ok(())
}
