// Upload pipeline: extract, chunk, embed, persist, catalog


use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::store::persist;
use crate::database::{DocumentCatalog, DocumentMetadata, DocumentStore, FileType};
use crate::embeddings::{Chunk, Chunker, EmbeddingProvider};
use crate::extract::{DefaultExtractor, TextExtractor};
use crate::{RagError, Result};

pub const EMPTY_DOCUMENT: &str = "No text content found in document";

/// Text and chunks of an upload before any embedding work
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocument {
    pub file_type: FileType,
    pub text: String,
    pub chunks: Vec<Chunk>,
}

impl PreparedDocument {
    #[inline]
    pub fn total_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Registers uploads in the catalog only once both artifacts are on disk
pub struct Ingestor {
    extractor: Box<dyn TextExtractor>,
    chunker: Chunker,
    catalog: DocumentCatalog,
    vectors_dir: PathBuf,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("chunker", &self.chunker)
            .field("catalog", &self.catalog)
            .field("vectors_dir", &self.vectors_dir)
            .finish_non_exhaustive()
    }
}

impl Ingestor {
    #[inline]
    pub fn new(
        extractor: Box<dyn TextExtractor>,
        chunker: Chunker,
        catalog: DocumentCatalog,
        vectors_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            chunker,
            catalog,
            vectors_dir: vectors_dir.into(),
        }
    }

    /// Default extractor with the chunking policy and paths from `config`
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Box::new(DefaultExtractor),
            Chunker::new(&config.chunking)?,
            DocumentCatalog::new(config.catalog_path()),
            config.vectors_dir(),
        ))
    }

    #[inline]
    pub fn catalog(&self) -> &DocumentCatalog {
        &self.catalog
    }

    /// Detect the type, extract text and split it into chunks
    #[inline]
    pub fn prepare(&self, filename: &str, bytes: &[u8]) -> Result<PreparedDocument> {
        let file_type = FileType::from_filename(filename)?;
        let text = self.extractor.extract(file_type, bytes)?;

        if text.trim().is_empty() {
            return Err(RagError::Extraction(EMPTY_DOCUMENT.to_string()));
        }

        let chunks = self.chunker.chunk(&text);
        info!(
            "Prepared {}: {} characters in {} chunks",
            filename,
            text.chars().count(),
            chunks.len()
        );

        Ok(PreparedDocument {
            file_type,
            text,
            chunks,
        })
    }

    /// Read a file from disk and ingest it under its own file name
    #[inline]
    pub fn ingest_path(
        &self,
        path: &Path,
        provider: Box<dyn EmbeddingProvider>,
    ) -> Result<DocumentStore> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                RagError::Extraction(format!("Invalid file name: {}", path.display()))
            })?;
        let bytes = fs::read(path)?;
        self.ingest(filename, &bytes, provider)
    }

    /// Run the whole upload. On any failure nothing stays registered or on disk.
    #[inline]
    pub fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
        provider: Box<dyn EmbeddingProvider>,
    ) -> Result<DocumentStore> {
        let bar = spinner();
        bar.set_message(format!("Reading {filename}"));

        let prepared = self.prepare(filename, bytes).inspect_err(|_| bar.finish_and_clear())?;

        let metadata = DocumentMetadata::new(
            filename,
            prepared.file_type,
            prepared.total_chars(),
            prepared.chunks.len(),
            provider.kind(),
        );
        let document_id = metadata.id;

        bar.set_message(format!(
            "Embedding {} chunks with {}",
            prepared.chunks.len(),
            provider.kind()
        ));

        let mut store = DocumentStore::new(&self.vectors_dir, provider);
        let stored = store
            .add_document(prepared.chunks, metadata)
            .and_then(|metadata| {
                bar.set_message("Updating catalog");
                self.catalog.add(metadata)
            });
        bar.finish_and_clear();

        if let Err(e) = stored {
            error!("Ingestion of {} failed: {}", filename, e);
            self.roll_back(&document_id);
            return Err(e);
        }

        if store.metadata().is_some_and(|m| m.fallback_embeddings) {
            warn!("{} was indexed with fallback embeddings", filename);
        }
        info!("Ingested {} as {}", filename, document_id);

        Ok(store)
    }

    fn roll_back(&self, document_id: &uuid::Uuid) {
        match persist::delete(&self.vectors_dir, document_id) {
            Ok(true) => info!("Removed partial artifacts for {}", document_id),
            Ok(false) => {}
            Err(e) => warn!("Could not remove artifacts for {}: {}", document_id, e),
        }
    }
}

fn spinner() -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let bar = ProgressBar::new_spinner().with_style(style);
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}
