// On-disk layout of one document: `{id}.index` (bincode vectors) and
// `{id}.json` (chunks plus metadata). The pair is written index-first and is
// not transactional; `load` reports a half-written pair as corruption.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::DocumentMetadata;
use crate::database::index::FlatIndex;
use crate::embeddings::Chunk;
use crate::{RagError, Result};

/// Everything persisted for one document
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub index: FlatIndex,
    pub chunks: Vec<Chunk>,
    pub metadata: DocumentMetadata,
}

#[derive(Serialize)]
struct RecordRef<'a> {
    chunks: &'a [Chunk],
    metadata: &'a DocumentMetadata,
}

#[derive(Deserialize)]
struct Record {
    chunks: Vec<Chunk>,
    metadata: DocumentMetadata,
}

#[inline]
pub fn index_path(dir: &Path, document_id: &Uuid) -> PathBuf {
    dir.join(format!("{document_id}.index"))
}

#[inline]
pub fn record_path(dir: &Path, document_id: &Uuid) -> PathBuf {
    dir.join(format!("{document_id}.json"))
}

/// Validate and write both artifacts for `document_id`
#[inline]
pub fn save(
    dir: &Path,
    document_id: &Uuid,
    index: &FlatIndex,
    chunks: &[Chunk],
    metadata: &DocumentMetadata,
) -> Result<()> {
    if metadata.id != *document_id {
        return Err(RagError::Corruption(format!(
            "Metadata id {} does not match document {}",
            metadata.id, document_id
        )));
    }
    if metadata.total_chunks != chunks.len() || chunks.len() != index.rows() {
        return Err(RagError::Corruption(format!(
            "Chunk counts disagree: metadata {}, chunks {}, index rows {}",
            metadata.total_chunks,
            chunks.len(),
            index.rows()
        )));
    }
    let expected = metadata.provider.dimension();
    if index.dimension() != expected {
        return Err(RagError::Dimension {
            expected,
            actual: index.dimension(),
        });
    }

    fs::create_dir_all(dir)?;

    let index_file = index_path(dir, document_id);
    let mut writer = BufWriter::new(File::create(&index_file)?);
    index.write_to(&mut writer)?;
    writer.flush()?;

    let record = RecordRef { chunks, metadata };
    fs::write(
        record_path(dir, document_id),
        serde_json::to_string_pretty(&record)?,
    )?;

    info!(
        "Saved document {} ({} chunks) to {}",
        document_id,
        chunks.len(),
        dir.display()
    );
    Ok(())
}

/// Load and cross-check both artifacts for `document_id`
#[inline]
pub fn load(dir: &Path, document_id: &Uuid) -> Result<StoredDocument> {
    let index_file = index_path(dir, document_id);
    let record_file = record_path(dir, document_id);

    match (index_file.exists(), record_file.exists()) {
        (false, false) => return Err(RagError::NotFound(document_id.to_string())),
        (true, false) => {
            return Err(RagError::Corruption(format!(
                "{} is missing its chunk record",
                document_id
            )));
        }
        (false, true) => {
            return Err(RagError::Corruption(format!(
                "{} is missing its vector index",
                document_id
            )));
        }
        (true, true) => {}
    }

    debug!("Loading document {} from {}", document_id, dir.display());

    let index = FlatIndex::read_from(BufReader::new(File::open(&index_file)?))?;

    let record: Record = serde_json::from_str(&fs::read_to_string(&record_file)?)
        .map_err(|e| RagError::Corruption(format!("Unreadable record for {}: {}", document_id, e)))?;

    validate(document_id, &index, &record)?;

    Ok(StoredDocument {
        index,
        chunks: record.chunks,
        metadata: record.metadata,
    })
}

fn validate(document_id: &Uuid, index: &FlatIndex, record: &Record) -> Result<()> {
    let metadata = &record.metadata;

    if metadata.id != *document_id {
        return Err(RagError::Corruption(format!(
            "Record for {} carries id {}",
            document_id, metadata.id
        )));
    }
    if metadata.total_chunks != record.chunks.len() || record.chunks.len() != index.rows() {
        return Err(RagError::Corruption(format!(
            "Chunk counts disagree for {}: metadata {}, chunks {}, index rows {}",
            document_id,
            metadata.total_chunks,
            record.chunks.len(),
            index.rows()
        )));
    }
    if let Some((position, chunk)) = record
        .chunks
        .iter()
        .enumerate()
        .find(|(i, c)| c.chunk_id != *i)
    {
        return Err(RagError::Corruption(format!(
            "Chunk at position {} has id {}",
            position, chunk.chunk_id
        )));
    }
    if index.dimension() != metadata.provider.dimension() {
        return Err(RagError::Corruption(format!(
            "Index dimension {} does not match {} ({})",
            index.dimension(),
            metadata.provider,
            metadata.provider.dimension()
        )));
    }
    Ok(())
}

/// Remove both artifacts; returns whether anything was deleted
#[inline]
pub fn delete(dir: &Path, document_id: &Uuid) -> Result<bool> {
    let mut removed = false;
    for path in [index_path(dir, document_id), record_path(dir, document_id)] {
        match fs::remove_file(&path) {
            Ok(()) => removed = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to remove {}: {}", path.display(), e);
                return Err(e.into());
            }
        }
    }
    if removed {
        debug!("Deleted artifacts for document {}", document_id);
    }
    Ok(removed)
}
