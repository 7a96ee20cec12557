// Chat transcript and document summary reports


use chrono::Local;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::Result;
use crate::chat::{ChatMessage, Role};
use crate::database::{ChatLogEntry, DocumentMetadata};
use crate::embeddings::Chunk;
use crate::utils::{format_timestamp, sanitize_filename};

const SAMPLE_CHUNKS: usize = 3;
const SAMPLE_CHARS: usize = 500;

/// A user question and the assistant message that answered it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QaPair<'a> {
    pub question: &'a ChatMessage,
    pub answer: &'a ChatMessage,
}

/// Pair each assistant message with the user message before it.
///
/// A later user message replaces an unanswered one; assistant messages with
/// no pending question are dropped.
#[inline]
pub fn group_qa_pairs(messages: &[ChatMessage]) -> Vec<QaPair<'_>> {
    let mut pairs = Vec::new();
    let mut pending = None;

    for message in messages {
        match message.role {
            Role::User => pending = Some(message),
            Role::Assistant => {
                if let Some(question) = pending.take() {
                    pairs.push(QaPair {
                        question,
                        answer: message,
                    });
                }
            }
        }
    }

    pairs
}

/// Rebuild a conversation from logged question/answer entries
#[inline]
pub fn messages_from_log(entries: &[ChatLogEntry]) -> Vec<ChatMessage> {
    entries
        .iter()
        .flat_map(|entry| {
            [
                ChatMessage::user(entry.question.clone()),
                ChatMessage::assistant(entry.answer.clone(), entry.sources.clone()),
            ]
        })
        .collect()
}

#[inline]
pub fn chat_export_title(document_name: &str) -> String {
    format!("Chat Export: {document_name}")
}

/// Facts shown in a document summary report
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub filename: String,
    pub file_type: String,
    pub upload_date: String,
    pub total_chars: usize,
    pub total_chunks: usize,
    pub samples: Vec<String>,
}

impl DocumentSummary {
    /// Summary with up to three leading chunks, each cut to 500 characters
    #[inline]
    pub fn new(metadata: &DocumentMetadata, chunks: &[Chunk]) -> Self {
        let samples = chunks
            .iter()
            .take(SAMPLE_CHUNKS)
            .map(|chunk| {
                if chunk.text.chars().count() > SAMPLE_CHARS {
                    let head: String = chunk.text.chars().take(SAMPLE_CHARS).collect();
                    format!("{head}...")
                } else {
                    chunk.text.clone()
                }
            })
            .collect();

        Self {
            filename: metadata.filename.clone(),
            file_type: metadata.file_type.to_string(),
            upload_date: format_timestamp(&metadata.processed_date),
            total_chars: metadata.total_chars,
            total_chunks: metadata.total_chunks,
            samples,
        }
    }
}

/// Turns chat transcripts and summaries into report bytes
pub trait ReportRenderer {
    /// File extension for rendered reports, without the dot
    fn extension(&self) -> &'static str;

    fn render(
        &self,
        title: &str,
        document_name: &str,
        messages: &[ChatMessage],
    ) -> Result<Vec<u8>>;

    fn render_summary(&self, summary: &DocumentSummary) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownReport;

fn markdown_transcript(
    title: &str,
    document_name: &str,
    messages: &[ChatMessage],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let exported = format_timestamp(&Local::now().naive_local());

    writeln!(out, "# {title}\n")?;
    writeln!(out, "Document: {document_name}\n")?;
    writeln!(out, "_Exported on {exported}_\n")?;

    let pairs = group_qa_pairs(messages);
    if pairs.is_empty() {
        out.push_str("No questions have been answered yet.\n");
    }

    for (i, pair) in pairs.iter().enumerate() {
        let number = i + 1;
        writeln!(out, "---\n")?;
        writeln!(out, "**Q{number}:** {}\n", pair.question.content)?;
        writeln!(out, "**A{number}:** {}\n", pair.answer.content)?;

        if !pair.answer.sources.is_empty() {
            out.push_str("**Sources:**\n\n");
            for source in &pair.answer.sources {
                writeln!(out, "- {source}")?;
            }
            out.push('\n');
        }
    }

    Ok(out)
}

fn markdown_summary(summary: &DocumentSummary) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "# Document Summary: {}\n", summary.filename)?;
    out.push_str("## File Information\n\n");
    writeln!(out, "- Filename: {}", summary.filename)?;
    writeln!(out, "- Type: {}", summary.file_type)?;
    writeln!(out, "- Upload Date: {}", summary.upload_date)?;
    writeln!(out, "- Characters: {}", summary.total_chars)?;
    writeln!(out, "- Total Chunks: {}\n", summary.total_chunks)?;

    if !summary.samples.is_empty() {
        out.push_str("## Content Sample\n\n");
        for (i, sample) in summary.samples.iter().enumerate() {
            writeln!(out, "**Chunk {}:**\n\n{}\n", i + 1, sample)?;
        }
    }

    Ok(out)
}

impl ReportRenderer for MarkdownReport {
    #[inline]
    fn extension(&self) -> &'static str {
        "md"
    }

    #[inline]
    fn render(
        &self,
        title: &str,
        document_name: &str,
        messages: &[ChatMessage],
    ) -> Result<Vec<u8>> {
        Ok(markdown_transcript(title, document_name, messages)?.into_bytes())
    }

    #[inline]
    fn render_summary(&self, summary: &DocumentSummary) -> Result<Vec<u8>> {
        Ok(markdown_summary(summary)?.into_bytes())
    }
}

/// Writes rendered reports into an exports directory
pub struct Exporter {
    dir: PathBuf,
    renderer: Box<dyn ReportRenderer>,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("dir", &self.dir)
            .field("extension", &self.renderer.extension())
            .finish()
    }
}

impl Exporter {
    #[inline]
    pub fn new(dir: impl Into<PathBuf>, renderer: Box<dyn ReportRenderer>) -> Self {
        Self {
            dir: dir.into(),
            renderer,
        }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn export_chat(&self, document_name: &str, messages: &[ChatMessage]) -> Result<PathBuf> {
        let bytes = self
            .renderer
            .render(&chat_export_title(document_name), document_name, messages)?;
        let stem = format!("chat_export_{}", sanitize_filename(document_name));
        self.write(&stem, &bytes)
    }

    #[inline]
    pub fn export_summary(&self, summary: &DocumentSummary) -> Result<PathBuf> {
        let bytes = self.renderer.render_summary(summary)?;
        let stem = format!("document_summary_{}", sanitize_filename(&summary.filename));
        self.write(&stem, &bytes)
    }

    fn write(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .dir
            .join(format!("{stem}_{timestamp}.{}", self.renderer.extension()));
        fs::write(&path, bytes)?;

        info!("Wrote report {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}
