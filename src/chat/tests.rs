use super::*;
use tempfile::TempDir;

use crate::database::{DocumentMetadata, FileType};
use crate::embeddings::{Chunker, ChunkingConfig, ProviderKind};
use crate::test_support::{KeywordEmbedder, ScriptedGenerator};

const GUIDE: &str = "The kettle must be descaled every month with white vinegar. \
    Always unplug the kettle before cleaning the base. \
    The warranty covers heating element failures for two years.";

fn store_with(dir: &TempDir, embedder: KeywordEmbedder) -> DocumentStore {
    let mut store = DocumentStore::new(dir.path(), Box::new(embedder));
    let chunks = Chunker::new(&ChunkingConfig {
        chunk_size_tokens: 13,
        chunk_overlap_tokens: 0,
    })
    .expect("valid config")
    .chunk(GUIDE);
    let metadata = DocumentMetadata::new(
        "kettle-manual.md",
        FileType::Md,
        GUIDE.len(),
        chunks.len(),
        ProviderKind::OpenAi,
    );
    store.add_document(chunks, metadata).expect("stored");
    store
}

fn chunk(id: usize, text: &str) -> Chunk {
    Chunk {
        text: text.to_string(),
        chunk_id: id,
        start_word: 0,
        end_word: 1,
        word_count: 1,
    }
}

#[test]
fn retrieval_config_bounds() {
    assert!(RetrievalConfig::default().validate().is_ok());
    assert!(
        RetrievalConfig {
            top_k: 0,
            ..RetrievalConfig::default()
        }
        .validate()
        .is_err()
    );
    assert!(
        RetrievalConfig {
            history_turns: 51,
            ..RetrievalConfig::default()
        }
        .validate()
        .is_err()
    );
}

#[test]
fn source_line_format() {
    let long = "x".repeat(150);
    assert_eq!(
        format_source(&chunk(3, &long), 0.8567),
        format!("Chunk 3: \"{}...\" (Relevance: 0.86)", "x".repeat(100))
    );
    assert_eq!(
        format_source(&chunk(0, "short"), 1.0),
        "Chunk 0: \"short...\" (Relevance: 1.00)"
    );
}

#[test]
fn source_preview_counts_characters() {
    let text = "é".repeat(120);
    let line = format_source(&chunk(1, &text), 0.5);
    assert!(line.contains(&"é".repeat(100)));
    assert!(!line.contains(&"é".repeat(101)));
}

#[test]
fn history_keeps_last_turns() {
    let history = vec![
        ChatMessage::user("one"),
        ChatMessage::assistant("two", Vec::new()),
        ChatMessage::user("three"),
        ChatMessage::assistant("four", Vec::new()),
    ];
    assert_eq!(
        render_history(&history, 2),
        "User: three\nAssistant: four\n"
    );
    assert_eq!(render_history(&history, 10).lines().count(), 4);
    assert_eq!(render_history(&history, 0), "");
}

#[test]
fn first_question_prompt() {
    let dir = TempDir::new().expect("temp dir");
    let store = store_with(&dir, KeywordEmbedder::new(ProviderKind::OpenAi));
    let generator = ScriptedGenerator::replying("Use white vinegar monthly.");
    let prompts = generator.prompts();
    let orchestrator = Orchestrator::new(Box::new(generator), RetrievalConfig::default());

    let answer = orchestrator.answer("How do I descale the kettle?", &store, &[]);

    assert_eq!(answer.answer, "Use white vinegar monthly.");
    assert!(!answer.degraded);
    assert_eq!(answer.context_used, store.chunks().len().min(5));
    assert_eq!(answer.sources.len(), answer.context_used);
    assert!(answer.sources[0].starts_with("Chunk "));

    let prompts = prompts.lock().expect("prompts");
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].user, "Question: How do I descale the kettle?");
    assert!(prompts[0].system.contains("\"kettle-manual.md\""));
    assert!(prompts[0].system.contains("descaled every month"));
    assert!(prompts[0].system.contains("ONLY on the provided context"));
}

#[test]
fn follow_up_includes_recent_history() {
    let dir = TempDir::new().expect("temp dir");
    let store = store_with(&dir, KeywordEmbedder::new(ProviderKind::OpenAi));
    let generator = ScriptedGenerator::replying("Two years.");
    let prompts = generator.prompts();
    let config = RetrievalConfig {
        top_k: 2,
        history_turns: 2,
    };
    let orchestrator = Orchestrator::new(Box::new(generator), config);

    let history = vec![
        ChatMessage::user("oldest question"),
        ChatMessage::assistant("oldest answer", Vec::new()),
        ChatMessage::user("What does the warranty cover?"),
        ChatMessage::assistant("Heating element failures.", Vec::new()),
    ];
    let answer = orchestrator.answer("For how long?", &store, &history);

    assert_eq!(answer.answer, "Two years.");
    assert!(answer.context_used <= 2);

    let prompts = prompts.lock().expect("prompts");
    assert_eq!(prompts[0].user, "Follow-up question: For how long?");
    assert!(prompts[0].system.contains("Previous conversation:"));
    assert!(prompts[0].system.contains("User: What does the warranty cover?"));
    assert!(prompts[0].system.contains("Assistant: Heating element failures."));
    assert!(!prompts[0].system.contains("oldest"));
}

#[test]
fn empty_document_answers_without_generator() {
    let dir = TempDir::new().expect("temp dir");
    let store = DocumentStore::new(
        dir.path(),
        Box::new(KeywordEmbedder::new(ProviderKind::OpenAi)),
    );
    let generator = ScriptedGenerator::replying("should not be used");
    let prompts = generator.prompts();
    let orchestrator = Orchestrator::new(Box::new(generator), RetrievalConfig::default());

    let answer = orchestrator.answer("Anything?", &store, &[]);

    assert_eq!(answer.answer, NO_RELEVANT_INFORMATION);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.context_used, 0);
    assert!(prompts.lock().expect("prompts").is_empty());
}

#[test]
fn blank_reply_becomes_placeholder() {
    let dir = TempDir::new().expect("temp dir");
    let store = store_with(&dir, KeywordEmbedder::new(ProviderKind::OpenAi));
    let orchestrator = Orchestrator::new(
        Box::new(ScriptedGenerator::replying("   ")),
        RetrievalConfig::default(),
    );

    let answer = orchestrator.answer("warranty", &store, &[]);
    assert_eq!(answer.answer, NO_RESPONSE_GENERATED);
    assert!(!answer.sources.is_empty());
}

#[test]
fn generator_failure_becomes_apology() {
    let dir = TempDir::new().expect("temp dir");
    let store = store_with(&dir, KeywordEmbedder::new(ProviderKind::OpenAi));
    let orchestrator = Orchestrator::new(
        Box::new(ScriptedGenerator::failing("rate limited")),
        RetrievalConfig::default(),
    );

    let answer = orchestrator.answer("warranty", &store, &[]);
    assert!(
        answer
            .answer
            .starts_with("I encountered an error while processing your question: ")
    );
    assert!(answer.answer.contains("rate limited"));
    assert!(answer.sources.is_empty());
}

#[test]
fn embedding_failure_becomes_apology() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = store_with(&dir, KeywordEmbedder::new(ProviderKind::OpenAi));
    let id = store.metadata().expect("metadata").id;

    // Reopen with a provider whose backend now fails
    store = DocumentStore::open(
        dir.path(),
        &id,
        &FailingFactory,
    )
    .expect("reopen");

    let generator = ScriptedGenerator::replying("unused");
    let prompts = generator.prompts();
    let orchestrator = Orchestrator::new(Box::new(generator), RetrievalConfig::default());

    let answer = orchestrator.answer("warranty", &store, &[]);
    assert!(answer.answer.contains("embedding backend unavailable"));
    assert!(prompts.lock().expect("prompts").is_empty());
}

#[test]
fn degraded_retrieval_is_flagged() {
    let dir = TempDir::new().expect("temp dir");
    let store = store_with(&dir, KeywordEmbedder::new(ProviderKind::OpenAi).degraded());
    let orchestrator = Orchestrator::new(
        Box::new(ScriptedGenerator::replying("ok")),
        RetrievalConfig::default(),
    );

    let answer = orchestrator.answer("kettle", &store, &[]);
    assert!(answer.degraded);
    assert_eq!(answer.answer, "ok");
}

struct FailingFactory;

impl crate::embeddings::ProviderFactory for FailingFactory {
    fn create(
        &self,
        kind: ProviderKind,
    ) -> crate::Result<Box<dyn crate::embeddings::EmbeddingProvider>> {
        Ok(Box::new(KeywordEmbedder::new(kind).failing()))
    }
}

#[test]
fn chat_message_serde() {
    let message = ChatMessage::assistant("hi", vec!["Chunk 0".to_string()]);
    let json = serde_json::to_value(&message).expect("serialize");
    assert_eq!(json["role"], "assistant");

    let parsed: ChatMessage =
        serde_json::from_str(r#"{"role":"user","content":"q"}"#).expect("deserialize");
    assert_eq!(parsed, ChatMessage::user("q"));
}
