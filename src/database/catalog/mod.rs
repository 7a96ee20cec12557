
use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::store::DocumentMetadata;
use crate::{RagError, Result};

/// A JSON array file rewritten in full on every change.
///
/// A missing file reads as empty. Concurrent writers are not coordinated;
/// the last write wins.
#[derive(Debug, Clone)]
pub struct JsonLog<T> {
    path: PathBuf,
    _entries: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> JsonLog<T> {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _entries: PhantomData,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn read_all(&self) -> Result<Vec<T>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            RagError::Corruption(format!("Unreadable log {}: {}", self.path.display(), e))
        })
    }

    #[inline]
    pub fn write_all(&self, entries: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        debug!("Wrote {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    #[inline]
    pub fn append(&self, entry: T) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.push(entry);
        self.write_all(&entries)
    }
}

/// Catalog of processed documents (`documents.json`)
#[derive(Debug, Clone)]
pub struct DocumentCatalog {
    log: JsonLog<DocumentMetadata>,
}

impl DocumentCatalog {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: JsonLog::new(path),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        self.log.path()
    }

    #[inline]
    pub fn list(&self) -> Result<Vec<DocumentMetadata>> {
        self.log.read_all()
    }

    #[inline]
    pub fn add(&self, metadata: DocumentMetadata) -> Result<()> {
        info!("Cataloging document {} ({})", metadata.filename, metadata.id);
        self.log.append(metadata)
    }

    /// Drop a document from the catalog; returns whether it was present
    #[inline]
    pub fn remove(&self, document_id: &Uuid) -> Result<bool> {
        let mut entries = self.log.read_all()?;
        let before = entries.len();
        entries.retain(|m| m.id != *document_id);
        if entries.len() == before {
            return Ok(false);
        }
        self.log.write_all(&entries)?;
        Ok(true)
    }

    /// Resolve a full id, a unique id prefix, or an exact filename
    #[inline]
    pub fn find(&self, reference: &str) -> Result<DocumentMetadata> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(RagError::NotFound("empty document reference".to_string()));
        }

        let entries = self.log.read_all()?;

        if let Some(exact) = entries.iter().find(|m| m.id.to_string() == reference) {
            return Ok(exact.clone());
        }

        let mut matches: Vec<&DocumentMetadata> = entries
            .iter()
            .filter(|m| m.id.to_string().starts_with(reference))
            .collect();
        if matches.is_empty() {
            matches = entries.iter().filter(|m| m.filename == reference).collect();
        }

        match matches.as_slice() {
            [] => Err(RagError::NotFound(reference.to_string())),
            [single] => Ok((*single).clone()),
            several => Err(RagError::NotFound(format!(
                "{} is ambiguous ({} documents match)",
                reference,
                several.len()
            ))),
        }
    }
}

/// One answered question, as recorded in `chat_history.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub timestamp: NaiveDateTime,
    pub document_id: Uuid,
    pub document_name: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ChatLogEntry {
    #[inline]
    pub fn new(
        document: &DocumentMetadata,
        question: impl Into<String>,
        answer: impl Into<String>,
        sources: Vec<String>,
    ) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            document_id: document.id,
            document_name: document.filename.clone(),
            question: question.into(),
            answer: answer.into(),
            sources,
        }
    }
}

/// Append-only log of answered questions
#[derive(Debug, Clone)]
pub struct ChatHistory {
    log: JsonLog<ChatLogEntry>,
}

impl ChatHistory {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: JsonLog::new(path),
        }
    }

    #[inline]
    pub fn record(&self, entry: ChatLogEntry) -> Result<()> {
        self.log.append(entry)
    }

    #[inline]
    pub fn entries(&self) -> Result<Vec<ChatLogEntry>> {
        self.log.read_all()
    }

    /// Entries for one document, oldest first
    #[inline]
    pub fn for_document(&self, document_id: &Uuid) -> Result<Vec<ChatLogEntry>> {
        let mut entries = self.log.read_all()?;
        entries.retain(|e| e.document_id == *document_id);
        Ok(entries)
    }

    /// The newest `limit` entries, oldest first
    #[inline]
    pub fn recent(&self, limit: usize) -> Result<Vec<ChatLogEntry>> {
        let entries = self.log.read_all()?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }
}
