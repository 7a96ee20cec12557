
pub mod persist;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::index::FlatIndex;
use crate::embeddings::{
    Chunk, EmbeddingMode, EmbeddingProvider, ProviderFactory, ProviderKind, not_configured,
};
use crate::{RagError, Result};

/// Supported upload formats, keyed by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Md,
    Html,
    Htm,
}

impl FileType {
    /// Detect the type from the text after the last `.` in `filename`
    #[inline]
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = filename.rsplit('.').next().unwrap_or_default();
        Self::from_extension(extension)
    }

    #[inline]
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "md" => Ok(Self::Md),
            "html" => Ok(Self::Html),
            "htm" => Ok(Self::Htm),
            other => Err(RagError::Extraction(format!("Unsupported file type: {other}"))),
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Md => "md",
            Self::Html => "html",
            Self::Htm => "htm",
        }
    }
}

impl std::fmt::Display for FileType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog record for one processed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: Uuid,
    pub filename: String,
    pub file_type: FileType,
    /// Local time the document was processed
    pub processed_date: NaiveDateTime,
    /// Characters of extracted text
    pub total_chars: usize,
    pub total_chunks: usize,
    /// Embedding space of the stored vectors; authoritative for queries
    pub provider: ProviderKind,
    /// Stored vectors are pseudo-embeddings from the degraded path
    #[serde(default)]
    pub fallback_embeddings: bool,
}

impl DocumentMetadata {
    /// Fresh metadata with a new id, stamped with the current local time
    #[inline]
    pub fn new(
        filename: impl Into<String>,
        file_type: FileType,
        total_chars: usize,
        total_chunks: usize,
        provider: ProviderKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            file_type,
            processed_date: Local::now().naive_local(),
            total_chars,
            total_chunks,
            provider,
            fallback_embeddings: false,
        }
    }
}

/// Result of a document search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    /// Chunks with cosine scores, best first
    pub hits: Vec<(Chunk, f32)>,
    /// The query or the stored vectors came from fallback embeddings
    pub degraded: bool,
}

/// One document's index, chunks and metadata, bound to the provider that
/// embedded it
pub struct DocumentStore {
    dir: PathBuf,
    provider: Box<dyn EmbeddingProvider>,
    index: FlatIndex,
    chunks: Vec<Chunk>,
    metadata: Option<DocumentMetadata>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("dir", &self.dir)
            .field("provider", &self.provider.kind())
            .field("rows", &self.index.rows())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl DocumentStore {
    /// An empty store that will embed with `provider` and persist under `dir`
    #[inline]
    pub fn new(dir: impl Into<PathBuf>, provider: Box<dyn EmbeddingProvider>) -> Self {
        let dimension = provider.dimension();
        Self {
            dir: dir.into(),
            provider,
            index: FlatIndex::empty(dimension),
            chunks: Vec::new(),
            metadata: None,
        }
    }

    /// Load a persisted document and rebuild the provider recorded in its metadata
    #[inline]
    pub fn open(
        dir: impl Into<PathBuf>,
        document_id: &Uuid,
        providers: &dyn ProviderFactory,
    ) -> Result<Self> {
        let dir = dir.into();
        let stored = persist::load(&dir, document_id)?;
        let provider = providers.create(stored.metadata.provider)?;

        if stored.metadata.fallback_embeddings {
            warn!(
                "Document {} was indexed with fallback embeddings; search results are not semantic",
                document_id
            );
        }

        debug!(
            "Opened document {} with {} chunks ({} provider)",
            document_id,
            stored.chunks.len(),
            stored.metadata.provider
        );

        Ok(Self {
            dir,
            provider,
            index: stored.index,
            chunks: stored.chunks,
            metadata: Some(stored.metadata),
        })
    }

    /// Embed `chunks`, rebuild the index and persist the document.
    ///
    /// Replaces any previous state held by this store. The returned metadata
    /// carries the provider and fallback flag actually used.
    #[inline]
    pub fn add_document(
        &mut self,
        chunks: Vec<Chunk>,
        mut metadata: DocumentMetadata,
    ) -> Result<DocumentMetadata> {
        if !self.provider.is_configured() {
            return Err(not_configured(self.provider.kind()));
        }

        info!(
            "Embedding {} chunks of {} with {}",
            chunks.len(),
            metadata.filename,
            self.provider.kind()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.provider.embed(&texts)?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::Provider(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let index = FlatIndex::build(self.provider.dimension(), &embeddings.vectors)?;

        metadata.provider = self.provider.kind();
        metadata.fallback_embeddings = embeddings.is_degraded();

        persist::save(&self.dir, &metadata.id, &index, &chunks, &metadata)?;

        self.index = index;
        self.chunks = chunks;
        self.metadata = Some(metadata.clone());

        Ok(metadata)
    }

    /// Top-`k` chunks for `query`, embedded with this document's own provider
    #[inline]
    pub fn search(&self, query: &str, k: usize) -> Result<SearchOutcome> {
        if self.index.is_empty() || k == 0 {
            return Ok(SearchOutcome::default());
        }

        let (vector, mode) = self.provider.embed_one(query)?;
        let results = self.index.search(&vector, k)?;

        let hits = results
            .into_iter()
            .filter_map(|(row, score)| self.chunks.get(row).map(|c| (c.clone(), score)))
            .collect();

        let stored_degraded = self.metadata.as_ref().is_some_and(|m| m.fallback_embeddings);

        Ok(SearchOutcome {
            hits,
            degraded: mode == EmbeddingMode::Fallback || stored_degraded,
        })
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[inline]
    pub fn metadata(&self) -> Option<&DocumentMetadata> {
        self.metadata.as_ref()
    }

    #[inline]
    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filename of the loaded document, or an empty string before one is added
    #[inline]
    pub fn document_name(&self) -> &str {
        self.metadata.as_ref().map_or("", |m| m.filename.as_str())
    }
}
