
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::{Read, Write};
use tracing::debug;

use crate::{RagError, Result};

const INDEX_MAGIC: [u8; 4] = *b"DRFX";
const INDEX_VERSION: u32 = 1;

/// Exact inner-product index over L2-normalized rows.
///
/// Scores are cosine similarities. The index is rebuilt wholesale; rows are
/// never added or removed in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    magic: [u8; 4],
    version: u32,
    dimension: u64,
    rows: u64,
    data: &'a [f32],
}

#[derive(Deserialize)]
struct IndexFile {
    magic: [u8; 4],
    version: u32,
    dimension: u64,
    rows: u64,
    data: Vec<f32>,
}

impl FlatIndex {
    #[inline]
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            rows: 0,
            data: Vec::new(),
        }
    }

    /// Build an index from `vectors`, storing normalized copies
    #[inline]
    pub fn build(dimension: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        let mut data = Vec::with_capacity(dimension * vectors.len());

        for vector in vectors {
            if vector.len() != dimension {
                return Err(RagError::Dimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend(normalize(vector));
        }

        debug!(
            "Built flat index with {} rows of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self {
            dimension,
            rows: vectors.len(),
            data,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Top-`k` rows by cosine similarity to `query`.
    ///
    /// Ties are broken by ascending row index so results are deterministic.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.rows == 0 || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension || self.dimension == 0 {
            return Err(RagError::Dimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let query = normalize(query);
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, row)| (i, dot(&query, row).clamp(-1.0, 1.0)))
            .collect();

        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Serialize behind a magic/version header
    #[inline]
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let file = IndexFileRef {
            magic: INDEX_MAGIC,
            version: INDEX_VERSION,
            dimension: self.dimension as u64,
            rows: self.rows as u64,
            data: &self.data,
        };
        bincode::serialize_into(writer, &file)
            .map_err(|e| RagError::Serialization(format!("Failed to write index: {}", e)))
    }

    /// Decode an index written by [`FlatIndex::write_to`]
    #[inline]
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let file: IndexFile = bincode::deserialize_from(reader)
            .map_err(|e| RagError::Corruption(format!("Failed to decode index: {}", e)))?;

        if file.magic != INDEX_MAGIC {
            return Err(RagError::Corruption("Not a vector index file".to_string()));
        }
        if file.version != INDEX_VERSION {
            return Err(RagError::Corruption(format!(
                "Unsupported index version {}",
                file.version
            )));
        }

        let dimension = usize::try_from(file.dimension)
            .map_err(|_| RagError::Corruption("Index dimension out of range".to_string()))?;
        let rows = usize::try_from(file.rows)
            .map_err(|_| RagError::Corruption("Index row count out of range".to_string()))?;

        if dimension.checked_mul(rows) != Some(file.data.len()) {
            return Err(RagError::Corruption(format!(
                "Index holds {} values, expected {} rows x {} dimensions",
                file.data.len(),
                rows,
                dimension
            )));
        }
        if dimension == 0 && rows > 0 {
            return Err(RagError::Corruption("Index has zero dimension".to_string()));
        }

        Ok(Self {
            dimension,
            rows,
            data: file.data,
        })
    }
}

/// Unit-length copy of `v`; zero vectors stay zero
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= 0.0 || !norm.is_finite() {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
