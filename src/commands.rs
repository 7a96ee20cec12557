use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Input;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::chat::{Answer, ChatMessage, Orchestrator};
use crate::config::{Config, Credentials};
use crate::database::store::persist;
use crate::database::{ChatHistory, ChatLogEntry, DocumentCatalog, DocumentMetadata, DocumentStore};
use crate::embeddings::{ConfiguredProviders, ProviderFactory, ProviderKind};
use crate::export::{DocumentSummary, Exporter, MarkdownReport, messages_from_log};
use crate::generation::create_generator;
use crate::ingest::Ingestor;
use crate::utils::{
    chunk_summary, estimate_tokens, extract_text_preview, file_type_icon, format_file_size,
    format_timestamp, truncate_text,
};

const EXIT_WORDS: [&str; 3] = ["exit", "quit", ":q"];

/// Load settings from `data_dir`, or from the default data directory
#[inline]
pub fn load_config(data_dir: Option<&Path>) -> Result<Config> {
    match data_dir {
        Some(dir) => Config::load(dir),
        None => Config::load_default(),
    }
}

fn catalog(config: &Config) -> DocumentCatalog {
    DocumentCatalog::new(config.catalog_path())
}

fn history(config: &Config) -> ChatHistory {
    ChatHistory::new(config.chat_history_path())
}

fn providers(config: &Config) -> ConfiguredProviders {
    ConfiguredProviders::new(config.clone(), Credentials::from_env(config))
}

fn find_document(config: &Config, reference: &str) -> Result<DocumentMetadata> {
    catalog(config)
        .find(reference)
        .with_context(|| format!("No document matches '{}'", reference))
}

fn open_document(config: &Config, metadata: &DocumentMetadata) -> Result<DocumentStore> {
    DocumentStore::open(config.vectors_dir(), &metadata.id, &providers(config))
        .with_context(|| format!("Failed to load document {}", metadata.filename))
}

/// Answers questions, or apologizes for each one when no chat model is available
enum Responder {
    Ready(Orchestrator),
    Unavailable(String),
}

impl Responder {
    fn answer(&self, question: &str, store: &DocumentStore, conversation: &[ChatMessage]) -> Answer {
        match self {
            Self::Ready(orchestrator) => orchestrator.answer(question, store, conversation),
            Self::Unavailable(reason) => Answer::apology(reason),
        }
    }
}

/// Answering pipeline for a document, using the chat model of the provider it was embedded with
fn responder(config: &Config, provider: ProviderKind, top_k: Option<usize>) -> Result<Responder> {
    let mut retrieval = config.retrieval.clone();
    if let Some(top_k) = top_k {
        retrieval.top_k = top_k;
    }
    retrieval.validate().context("Invalid retrieval settings")?;

    let credentials = Credentials::from_env(config);
    Ok(match create_generator(provider, config, &credentials) {
        Ok(generator) => Responder::Ready(Orchestrator::new(generator, retrieval)),
        Err(e) => {
            error!("Cannot answer questions with {}: {}", provider, e);
            Responder::Unavailable(e.to_string())
        }
    })
}

fn print_answer(answer: &Answer) {
    println!();
    println!("{}", answer.answer);

    if !answer.sources.is_empty() {
        println!();
        println!("{}", style("Sources:").bold().dim());
        for source in &answer.sources {
            println!("  {}", style(format!("• {}", source)).dim());
        }
    }

    if answer.degraded {
        println!();
        println!(
            "{}",
            style("⚠ Retrieval used fallback embeddings; results may not be relevant.").yellow()
        );
    }
    println!();
}

fn record(history: &ChatHistory, metadata: &DocumentMetadata, question: &str, answer: &Answer) {
    let entry = ChatLogEntry::new(
        metadata,
        question,
        answer.answer.clone(),
        answer.sources.clone(),
    );
    if let Err(e) = history.record(entry) {
        warn!("Failed to record chat history: {}", e);
    }
}

/// Ingest a file and register it in the catalog
#[inline]
pub fn upload_document(config: &Config, path: &Path, provider: Option<ProviderKind>) -> Result<()> {
    let provider = provider.unwrap_or(config.provider);
    info!("Uploading {} with {}", path.display(), provider);

    let size = std::fs::metadata(path)
        .with_context(|| format!("Cannot read {}", path.display()))?
        .len();

    let ingestor = Ingestor::from_config(config).context("Invalid chunking settings")?;
    let embedder = providers(config)
        .create(provider)
        .context("Failed to create embedding provider")?;

    let store = ingestor
        .ingest_path(path, embedder)
        .with_context(|| format!("Failed to process {}", path.display()))?;
    let metadata = store
        .metadata()
        .context("Ingested document has no metadata")?;

    println!(
        "{} {}",
        style("✓ Processed").green(),
        style(&metadata.filename).bold()
    );
    println!("   ID: {}", metadata.id);
    println!("   Size: {}", format_file_size(size));
    println!("   Characters: {}", metadata.total_chars);
    println!("   Chunks: {}", metadata.total_chunks);
    println!("   Provider: {}", metadata.provider);
    if metadata.fallback_embeddings {
        println!(
            "   {}",
            style("⚠ Embedding service unavailable; stored fallback embeddings").yellow()
        );
    }

    Ok(())
}

/// List every cataloged document
#[inline]
pub fn list_documents(config: &Config) -> Result<()> {
    let documents = catalog(config)
        .list()
        .context("Failed to read document catalog")?;

    if documents.is_empty() {
        println!("No documents have been uploaded yet.");
        println!("Use 'doc-rag upload <file>' to add one.");
        return Ok(());
    }

    println!("Documents ({} total):", documents.len());
    println!();

    for document in &documents {
        println!(
            "{} {} (ID: {})",
            file_type_icon(document.file_type),
            style(&document.filename).bold(),
            document.id
        );
        println!("   Processed: {}", format_timestamp(&document.processed_date));
        println!(
            "   Chunks: {}  Characters: {}  Provider: {}",
            document.total_chunks, document.total_chars, document.provider
        );
        if document.fallback_embeddings {
            println!("   {}", style("⚠ Fallback embeddings").yellow());
        }
        println!();
    }

    Ok(())
}

/// Answer one question and log it
#[inline]
pub fn ask_question(
    config: &Config,
    document: &str,
    question: &str,
    top_k: Option<usize>,
) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question must not be empty");
    }

    let metadata = find_document(config, document)?;
    let store = open_document(config, &metadata)?;
    let responder = responder(config, metadata.provider, top_k)?;

    let answer = responder.answer(question, &store, &[]);
    record(&history(config), &metadata, question, &answer);
    print_answer(&answer);

    Ok(())
}

/// Interactive question loop keeping the conversation as follow-up context
#[inline]
pub fn chat_session(config: &Config, document: &str, resume: bool) -> Result<()> {
    let metadata = find_document(config, document)?;
    let store = open_document(config, &metadata)?;
    let responder = responder(config, metadata.provider, None)?;
    let log = history(config);

    let mut conversation: Vec<ChatMessage> = if resume {
        let entries = log
            .for_document(&metadata.id)
            .context("Failed to read chat history")?;
        messages_from_log(&entries)
    } else {
        Vec::new()
    };

    eprintln!(
        "{} {}",
        style("💬 Chatting with").bold().cyan(),
        style(&metadata.filename).bold()
    );
    if !conversation.is_empty() {
        eprintln!("Resumed {} earlier questions.", conversation.len() / 2);
    }
    eprintln!("Type 'exit' or press Enter on an empty line to finish.");
    eprintln!();

    loop {
        let question: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        let question = question.trim();

        if question.is_empty() || EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }

        let answer = responder.answer(question, &store, &conversation);
        record(&log, &metadata, question, &answer);
        print_answer(&answer);

        conversation.push(ChatMessage::user(question));
        conversation.push(ChatMessage::assistant(
            answer.answer,
            answer.sources,
        ));
    }

    Ok(())
}

/// Print logged questions, optionally for one document
#[inline]
pub fn show_history(config: &Config, document: Option<&str>, limit: usize) -> Result<()> {
    let log = history(config);
    let mut entries = match document {
        Some(reference) => {
            let metadata = find_document(config, reference)?;
            log.for_document(&metadata.id)
        }
        None => log.entries(),
    }
    .context("Failed to read chat history")?;

    let skip = entries.len().saturating_sub(limit);
    entries.drain(..skip);

    if entries.is_empty() {
        println!("No questions have been asked yet.");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{} {}",
            style(format_timestamp(&entry.timestamp)).dim(),
            style(&entry.document_name).cyan()
        );
        println!("  Q: {}", entry.question);
        println!("  A: {}", truncate_text(&entry.answer, 200));
        println!();
    }

    Ok(())
}

/// Write a chat transcript or document summary report
#[inline]
pub fn export_report(config: &Config, document: &str, summary: bool) -> Result<PathBuf> {
    let metadata = find_document(config, document)?;
    let exporter = Exporter::new(config.exports_dir(), Box::new(MarkdownReport));

    let path = if summary {
        let stored = persist::load(&config.vectors_dir(), &metadata.id)
            .with_context(|| format!("Failed to load document {}", metadata.filename))?;
        exporter.export_summary(&DocumentSummary::new(&stored.metadata, &stored.chunks))
    } else {
        let entries = history(config)
            .for_document(&metadata.id)
            .context("Failed to read chat history")?;
        if entries.is_empty() {
            bail!("No chat history for {}", metadata.filename);
        }
        exporter.export_chat(&metadata.filename, &messages_from_log(&entries))
    }
    .context("Failed to write report")?;

    println!(
        "{} {}",
        style("✓ Exported to").green(),
        style(path.display()).cyan()
    );
    Ok(path)
}

/// Print a document's metadata and chunk overview
#[inline]
pub fn show_document(config: &Config, document: &str) -> Result<()> {
    let metadata = find_document(config, document)?;
    let stored = persist::load(&config.vectors_dir(), &metadata.id)
        .with_context(|| format!("Failed to load document {}", metadata.filename))?;
    let metadata = &stored.metadata;

    println!(
        "{} {}",
        file_type_icon(metadata.file_type),
        style(&metadata.filename).bold()
    );
    println!("   ID: {}", metadata.id);
    println!("   Type: {}", metadata.file_type);
    println!("   Processed: {}", format_timestamp(&metadata.processed_date));
    println!("   Characters: {}", metadata.total_chars);
    println!("   Provider: {}", metadata.provider);
    println!(
        "   Index: {} rows x {} dimensions",
        stored.index.rows(),
        stored.index.dimension()
    );

    let text: Vec<&str> = stored.chunks.iter().map(|c| c.text.as_str()).collect();
    let joined = text.join(" ");
    println!("   Estimated tokens: {}", estimate_tokens(&joined));
    println!();
    println!("{}", style("Preview:").bold().yellow());
    println!("   {}", extract_text_preview(&joined, 200));
    println!();

    println!("{}", style(format!("Chunks ({}):", stored.chunks.len())).bold().yellow());
    for chunk in &stored.chunks {
        println!("   {}", chunk_summary(chunk));
    }

    Ok(())
}

/// Remove a document from the catalog and delete its artifacts
#[inline]
pub fn delete_document(config: &Config, document: &str) -> Result<()> {
    let metadata = find_document(config, document)?;

    let removed = catalog(config)
        .remove(&metadata.id)
        .context("Failed to update document catalog")?;
    let deleted = persist::delete(&config.vectors_dir(), &metadata.id)
        .context("Failed to delete document artifacts")?;

    if !removed && !deleted {
        warn!("Document {} was already gone", metadata.id);
    }

    println!(
        "{} {} (ID: {})",
        style("✓ Deleted").green(),
        metadata.filename,
        metadata.id
    );
    Ok(())
}
