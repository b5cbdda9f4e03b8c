//! Embedding store
//!
//! Corpus records and their embeddings in parallel, position-aligned
//! containers. Loading is all-or-nothing.

use newsverify_common::corpus::{self, DocumentRecord};
use newsverify_common::errors::{AppError, Result};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    records: Vec<DocumentRecord>,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingStore {
    /// Pair records with vectors; fails with `CorpusMismatch` on unequal counts
    pub fn load(records: Vec<DocumentRecord>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if records.len() != vectors.len() {
            return Err(AppError::CorpusMismatch {
                records: records.len(),
                vectors: vectors.len(),
            });
        }
        Ok(Self { records, vectors })
    }

    /// Read both artefacts from disk, then pair them
    pub fn from_paths(records_path: &Path, vectors_path: &Path) -> Result<Self> {
        let records = corpus::read_records(records_path)?;
        let vectors = corpus::read_vectors(vectors_path)?;
        Self::load(records, vectors)
    }

    /// Record at `position`
    pub fn get(&self, position: usize) -> Option<&DocumentRecord> {
        self.records.get(position)
    }

    /// Embedding at `position`
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.get(position).map(|v| v.as_slice())
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
