//! Index snapshot persistence
//!
//! A snapshot stores the already-normalised rows so a deployment can load
//! the index instead of rebuilding it. The checksum is the hex SHA-256 of the
//! little-endian bytes of every row in order.

use super::SimilarityIndex;
use newsverify_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Current on-disk snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Rows loaded from disk must be unit length within this tolerance
const UNIT_NORM_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u32,
    pub dimension: usize,
    pub count: usize,
    pub checksum: String,
    pub vectors: Vec<Vec<f32>>,
}

fn checksum<'a>(rows: impl Iterator<Item = &'a [f32]>) -> String {
    let mut hasher = Sha256::new();
    for row in rows {
        for value in row {
            hasher.update(value.to_le_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

fn corrupt(message: impl Into<String>) -> AppError {
    AppError::SnapshotCorrupt {
        message: message.into(),
    }
}

impl IndexSnapshot {
    /// Capture an index
    pub fn from_index(index: &SimilarityIndex) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            dimension: index.dimension(),
            count: index.len(),
            checksum: checksum(index.rows()),
            vectors: index.rows().map(|row| row.to_vec()).collect(),
        }
    }

    /// Validate the snapshot and turn it back into an index
    pub fn into_index(self) -> Result<SimilarityIndex> {
        if self.version != SNAPSHOT_VERSION {
            return Err(corrupt(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if self.vectors.len() != self.count {
            return Err(corrupt(format!(
                "header declares {} vectors but {} are present",
                self.count,
                self.vectors.len()
            )));
        }

        let actual = checksum(self.vectors.iter().map(|v| v.as_slice()));
        if actual != self.checksum {
            return Err(corrupt("checksum mismatch"));
        }

        let mut data = Vec::with_capacity(self.dimension * self.count);
        for (position, row) in self.vectors.iter().enumerate() {
            if row.len() != self.dimension {
                return Err(AppError::DimensionMismatch {
                    expected: self.dimension,
                    actual: row.len(),
                });
            }
            let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            if !norm.is_finite() || (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(corrupt(format!(
                    "row {} is not unit length (norm {})",
                    position, norm
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(SimilarityIndex::from_normalized(self.dimension, data, self.count))
    }

    /// Write the snapshot as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    /// Read a snapshot from JSON; validation happens in `into_index`
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| corrupt(format!("{}: {}", path.display(), e)))
    }
}

impl SimilarityIndex {
    /// Persist this index to `path`
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        IndexSnapshot::from_index(self).save(path)
    }

    /// Load and validate an index snapshot from `path`
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        IndexSnapshot::load(path)?.into_index()
    }
}
