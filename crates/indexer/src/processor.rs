//! Offline index build
//!
//! Embeds every corpus record in batches, writes the parallel vectors file
//! and the index snapshot. Both artefacts are staged next to their targets
//! and renamed into place only once both have been written.

use newsverify_common::config::CorpusConfig;
use newsverify_common::corpus::{self, DocumentRecord};
use newsverify_common::embeddings::Embedder;
use newsverify_common::errors::{AppError, Result};
use newsverify_search::{load_corpus, EmbeddingStore, LoadedCorpus, SimilarityIndex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Counts reported after a build or check
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub documents: usize,
    pub dimension: usize,
    pub vectors_path: PathBuf,
    pub index_path: Option<PathBuf>,
    pub elapsed_ms: u64,
}

/// Corpus embedding processor
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed the records in order; output position `i` belongs to record `i`
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn embed_records(&self, records: &[DocumentRecord]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(records.len());

        for (batch_no, batch) in records.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(DocumentRecord::embedding_text).collect();
            let embedded = self.embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(AppError::CorpusMismatch {
                    records: texts.len(),
                    vectors: embedded.len(),
                });
            }
            vectors.extend(embedded);
            debug!(
                batch = batch_no + 1,
                embedded = vectors.len(),
                total = records.len(),
                "Embedded batch"
            );
        }

        Ok(vectors)
    }

    /// Full offline pass: records → vectors file → index snapshot
    pub async fn build(&self, config: &CorpusConfig) -> Result<BuildSummary> {
        let start = Instant::now();

        let records = corpus::read_records(&config.records_path)?;
        info!(
            records = records.len(),
            model = self.embedder.model_name(),
            "Loaded records, embedding"
        );

        let vectors = self.embed_records(&records).await?;

        // Validate before writing anything
        let index = SimilarityIndex::build(&vectors)?;
        let store = EmbeddingStore::load(records, vectors)?;
        let loaded = LoadedCorpus::new(store, index)?;

        persist(config, &loaded)?;

        Ok(BuildSummary {
            documents: loaded.store.len(),
            dimension: loaded.index.dimension(),
            vectors_path: config.vectors_path.clone(),
            index_path: config.index_path.clone(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Sibling path an artefact is staged under before it is moved into place
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard(paths: &[&Path]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

/// Stage both artefacts, then move them into place. The snapshot is moved
/// first, so a failed run leaves the previous vectors file untouched.
fn persist(config: &CorpusConfig, loaded: &LoadedCorpus) -> Result<()> {
    let vectors_tmp = staging_path(&config.vectors_path);
    let index_tmp = config.index_path.as_deref().map(staging_path);

    let staged = corpus::write_vectors(&vectors_tmp, loaded.store.vectors()).and_then(|_| {
        match &index_tmp {
            Some(tmp) => loaded.index.save_snapshot(tmp),
            None => Ok(()),
        }
    });
    if let Err(e) = staged {
        discard(&[vectors_tmp.as_path()]);
        if let Some(tmp) = &index_tmp {
            discard(&[tmp.as_path()]);
        }
        return Err(e);
    }

    if let (Some(path), Some(tmp)) = (&config.index_path, &index_tmp) {
        if let Err(e) = fs::rename(tmp, path) {
            discard(&[tmp.as_path(), vectors_tmp.as_path()]);
            return Err(e.into());
        }
        info!(path = %path.display(), "Index snapshot saved");
    }

    fs::rename(&vectors_tmp, &config.vectors_path).map_err(|e| {
        discard(&[vectors_tmp.as_path()]);
        AppError::from(e)
    })?;
    info!(path = %config.vectors_path.display(), "Embeddings saved");

    Ok(())
}

/// Load the persisted artefacts exactly as the server would
pub fn check(config: &CorpusConfig) -> Result<BuildSummary> {
    let start = Instant::now();
    let loaded = load_corpus(config)?;
    Ok(BuildSummary {
        documents: loaded.store.len(),
        dimension: loaded.index.dimension(),
        vectors_path: config.vectors_path.clone(),
        index_path: config.index_path.clone(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsverify_common::embeddings::MockEmbedder;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("newsverify-indexer-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_records(path: &Path, count: usize) {
        let records: Vec<DocumentRecord> = (0..count)
            .map(|i| DocumentRecord {
                published: format!("2024-01-{:02}", i + 1),
                categories: vec!["Science".into()],
                entities: vec![format!("Lab {}", i)],
                title: format!("Discovery number {}", i),
                content: format!("Researchers announced finding {}.", i),
            })
            .collect();
        std::fs::write(path, serde_json::to_vec(&records).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_embed_records_preserves_order_across_batches() {
        let embedder = Arc::new(MockEmbedder::new(8));
        let builder = IndexBuilder::new(embedder.clone(), 2);
        let records: Vec<DocumentRecord> = (0..5)
            .map(|i| DocumentRecord {
                published: String::new(),
                categories: vec![],
                entities: vec![],
                title: format!("t{}", i),
                content: String::new(),
            })
            .collect();

        let vectors = builder.embed_records(&records).await.unwrap();
        assert_eq!(vectors.len(), 5);
        for (record, vector) in records.iter().zip(&vectors) {
            assert_eq!(vector, &embedder.embed(&record.embedding_text()).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_build_then_check() {
        let dir = scratch_dir();
        let config = CorpusConfig {
            records_path: dir.join("articles.json"),
            vectors_path: dir.join("embeddings.json"),
            index_path: Some(dir.join("index.json")),
        };
        write_records(&config.records_path, 7);

        let builder = IndexBuilder::new(Arc::new(MockEmbedder::new(16)), 3);
        let built = builder.build(&config).await.unwrap();
        assert_eq!(built.documents, 7);
        assert_eq!(built.dimension, 16);

        let checked = check(&config).unwrap();
        assert_eq!(checked.documents, 7);
        assert_eq!(checked.dimension, 16);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_keeps_previous_vectors() {
        let dir = scratch_dir();
        let index_path = dir.join("index.json");
        // A directory where the snapshot file should go cannot be replaced
        std::fs::create_dir_all(index_path.join("occupied")).unwrap();
        let config = CorpusConfig {
            records_path: dir.join("articles.json"),
            vectors_path: dir.join("embeddings.json"),
            index_path: Some(index_path),
        };
        write_records(&config.records_path, 4);
        corpus::write_vectors(&config.vectors_path, &[vec![0.5, 0.5]]).unwrap();
        let before = std::fs::read(&config.vectors_path).unwrap();

        let builder = IndexBuilder::new(Arc::new(MockEmbedder::new(8)), 2);
        let result = builder.build(&config).await;

        let after = std::fs::read(&config.vectors_path).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        std::fs::remove_dir_all(&dir).ok();

        assert!(result.is_err());
        assert_eq!(before, after);
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_staging_path_is_a_sibling() {
        let staged = staging_path(Path::new("data/embeddings.json"));
        assert_eq!(staged, PathBuf::from("data/embeddings.json.tmp"));
    }

    #[tokio::test]
    async fn test_check_detects_misaligned_vectors() {
        let dir = scratch_dir();
        let config = CorpusConfig {
            records_path: dir.join("articles.json"),
            vectors_path: dir.join("embeddings.json"),
            index_path: None,
        };
        write_records(&config.records_path, 3);
        corpus::write_vectors(&config.vectors_path, &[vec![1.0, 0.0]]).unwrap();

        assert!(matches!(
            check(&config),
            Err(AppError::CorpusMismatch {
                records: 3,
                vectors: 1
            })
        ));

        std::fs::remove_dir_all(&dir).ok();
    }
}
