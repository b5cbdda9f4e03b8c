//! Startup loading of the read-only corpus
//!
//! Either loads a pre-built index snapshot or rebuilds the index from the
//! stored vectors. Any integrity failure here is fatal to the deployment.

use crate::index::{normalize, SimilarityIndex};
use crate::store::EmbeddingStore;
use newsverify_common::config::CorpusConfig;
use newsverify_common::errors::{AppError, Result};
use newsverify_common::metrics;
use std::sync::Arc;
use tracing::{info, warn};

/// Largest per-component drift accepted between a snapshot row and the
/// normalised stored vector it was built from
const SNAPSHOT_ROW_TOLERANCE: f32 = 1e-4;

/// Immutable corpus handles shared by every request
#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub store: Arc<EmbeddingStore>,
    pub index: Arc<SimilarityIndex>,
}

impl LoadedCorpus {
    /// Pair a store with an index, checking positional alignment
    pub fn new(store: EmbeddingStore, index: SimilarityIndex) -> Result<Self> {
        if index.len() != store.len() {
            return Err(AppError::CorpusMismatch {
                records: store.len(),
                vectors: index.len(),
            });
        }
        Ok(Self {
            store: Arc::new(store),
            index: Arc::new(index),
        })
    }

    /// Pair a store with a pre-built index, requiring every index row to be
    /// the normalised form of the stored vector at the same position
    pub fn from_snapshot(store: EmbeddingStore, index: SimilarityIndex) -> Result<Self> {
        if index.len() != store.len() {
            return Err(AppError::CorpusMismatch {
                records: store.len(),
                vectors: index.len(),
            });
        }

        for (position, stored) in store.vectors().iter().enumerate() {
            if stored.len() != index.dimension() {
                return Err(AppError::DimensionMismatch {
                    expected: stored.len(),
                    actual: index.dimension(),
                });
            }
            let expected = normalize(stored).ok_or(AppError::DegenerateVector { position })?;
            let row = index.vector(position).unwrap_or_default();
            let drifted = expected
                .iter()
                .zip(row)
                .any(|(a, b)| (a - b).abs() > SNAPSHOT_ROW_TOLERANCE);
            if drifted {
                return Err(AppError::SnapshotCorrupt {
                    message: format!("row {} does not match the stored vectors", position),
                });
            }
        }

        Self::new(store, index)
    }

    /// Build the index directly from the store's vectors
    pub fn from_store(store: EmbeddingStore) -> Result<Self> {
        let index = SimilarityIndex::build(store.vectors())?;
        Self::new(store, index)
    }
}

/// Load records, vectors and the index described by `config`
pub fn load_corpus(config: &CorpusConfig) -> Result<LoadedCorpus> {
    info!(
        records = %config.records_path.display(),
        vectors = %config.vectors_path.display(),
        "Loading corpus"
    );
    let store = EmbeddingStore::from_paths(&config.records_path, &config.vectors_path)?;

    let corpus = match &config.index_path {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "Loading index snapshot");
            let index = SimilarityIndex::load_snapshot(path)?;
            LoadedCorpus::from_snapshot(store, index)?
        }
        Some(path) => {
            warn!(path = %path.display(), "Index snapshot not found, rebuilding from vectors");
            LoadedCorpus::from_store(store)?
        }
        None => LoadedCorpus::from_store(store)?,
    };

    metrics::record_corpus_size(corpus.store.len());
    info!(
        documents = corpus.store.len(),
        dimension = corpus.index.dimension(),
        "Corpus loaded"
    );
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsverify_common::corpus;
    use newsverify_common::DocumentRecord;
    use std::path::PathBuf;

    fn record(title: &str) -> DocumentRecord {
        DocumentRecord {
            published: "2024-04-12".into(),
            categories: vec!["World".into()],
            entities: vec![],
            title: title.into(),
            content: format!("{} report", title),
        }
    }

    /// Records and vectors on disk, plus a snapshot built from `snapshot_vectors`
    fn corpus_on_disk(
        name: &str,
        vectors: &[Vec<f32>],
        snapshot_vectors: &[Vec<f32>],
    ) -> (PathBuf, CorpusConfig) {
        let dir = std::env::temp_dir().join(format!(
            "newsverify-loader-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let config = CorpusConfig {
            records_path: dir.join("articles.json"),
            vectors_path: dir.join("embeddings.json"),
            index_path: Some(dir.join("index.json")),
        };

        let records: Vec<DocumentRecord> =
            (0..vectors.len()).map(|i| record(&format!("story {}", i))).collect();
        std::fs::write(&config.records_path, serde_json::to_vec(&records).unwrap()).unwrap();
        corpus::write_vectors(&config.vectors_path, vectors).unwrap();
        SimilarityIndex::build(snapshot_vectors)
            .unwrap()
            .save_snapshot(config.index_path.as_ref().unwrap())
            .unwrap();

        (dir, config)
    }

    #[test]
    fn test_matching_snapshot_loads() {
        let vectors = vec![vec![3.0, 4.0, 0.0], vec![0.0, 0.0, 2.0]];
        let (dir, config) = corpus_on_disk("matching", &vectors, &vectors);

        let loaded = load_corpus(&config).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(loaded.store.len(), 2);
        assert_eq!(loaded.index.dimension(), 3);
        let hits = loaded.index.search(&vectors[1], 1).unwrap();
        assert_eq!(hits[0].position, 1);
    }

    #[test]
    fn test_snapshot_with_other_dimension_aborts_load() {
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let stale = vec![vec![1.0, 1.0], vec![-1.0, 1.0]];
        let (dir, config) = corpus_on_disk("dimension", &vectors, &stale);

        let result = load_corpus(&config);
        std::fs::remove_dir_all(&dir).ok();

        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_snapshot_with_other_rows_aborts_load() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let swapped = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let (dir, config) = corpus_on_disk("rows", &vectors, &swapped);

        let result = load_corpus(&config);
        std::fs::remove_dir_all(&dir).ok();

        assert!(matches!(result, Err(AppError::SnapshotCorrupt { .. })));
    }

    #[test]
    fn test_snapshot_tolerates_normalisation_rounding() {
        let store = EmbeddingStore::load(
            vec![record("a"), record("b")],
            vec![vec![10.0, 0.0], vec![1.0, 1.0]],
        )
        .unwrap();
        let index = SimilarityIndex::build(store.vectors()).unwrap();
        assert!(LoadedCorpus::from_snapshot(store, index).is_ok());
    }

    #[test]
    fn test_index_store_misalignment_rejected() {
        let store = EmbeddingStore::load(
            vec![DocumentRecord {
                published: String::new(),
                categories: vec![],
                entities: vec![],
                title: "only".into(),
                content: String::new(),
            }],
            vec![vec![1.0, 0.0]],
        )
        .unwrap();
        let index = SimilarityIndex::build(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();

        assert!(matches!(
            LoadedCorpus::new(store, index),
            Err(AppError::CorpusMismatch {
                records: 1,
                vectors: 2
            })
        ));
    }

    #[test]
    fn test_from_store_propagates_degenerate_vector() {
        let store = EmbeddingStore::load(
            vec![DocumentRecord {
                published: String::new(),
                categories: vec![],
                entities: vec![],
                title: "zero".into(),
                content: String::new(),
            }],
            vec![vec![0.0, 0.0]],
        )
        .unwrap();
        assert!(matches!(
            LoadedCorpus::from_store(store),
            Err(AppError::DegenerateVector { position: 0 })
        ));
    }
}
