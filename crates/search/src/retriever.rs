//! Evidence retriever
//!
//! Embeds a claim, searches the similarity index and joins each hit back to
//! its corpus record. The index's descending-score order is kept as-is.

use crate::index::SimilarityIndex;
use crate::loader::LoadedCorpus;
use crate::store::EmbeddingStore;
use newsverify_common::corpus::EvidenceItem;
use newsverify_common::embeddings::Embedder;
use newsverify_common::errors::{AppError, Result};
use newsverify_common::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Turns a claim into ranked evidence
pub struct Retriever {
    store: Arc<EmbeddingStore>,
    index: Arc<SimilarityIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    /// Create a retriever over an aligned store and index
    pub fn new(
        store: Arc<EmbeddingStore>,
        index: Arc<SimilarityIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if store.len() != index.len() {
            return Err(AppError::CorpusMismatch {
                records: store.len(),
                vectors: index.len(),
            });
        }
        if !index.is_empty() && embedder.dimension() != index.dimension() {
            warn!(
                embedder = embedder.dimension(),
                index = index.dimension(),
                model = embedder.model_name(),
                "Configured embedding dimension differs from the index"
            );
        }
        Ok(Self {
            store,
            index,
            embedder,
        })
    }

    /// Create a retriever from loaded corpus handles
    pub fn from_corpus(corpus: &LoadedCorpus, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::new(corpus.store.clone(), corpus.index.clone(), embedder)
    }

    /// Number of documents searchable by this retriever
    pub fn corpus_size(&self) -> usize {
        self.store.len()
    }

    pub fn index_dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Retrieve the `k` most similar corpus records for `claim`.
    ///
    /// Blank claims fail with `InvalidQuery` before the embedder is called.
    /// Embedder failures are returned unchanged.
    #[instrument(skip(self, claim), fields(claim_len = claim.len()))]
    pub async fn retrieve(&self, claim: &str, k: usize) -> Result<Vec<EvidenceItem>> {
        if claim.trim().is_empty() {
            return Err(AppError::InvalidQuery {
                message: "claim must not be empty".into(),
            });
        }
        if k == 0 {
            return Err(AppError::InvalidQuery {
                message: "k must be at least 1".into(),
            });
        }
        if self.index.is_empty() {
            return Err(AppError::EmptyIndex);
        }

        let start = Instant::now();
        let query = self.embedder.embed(claim).await?;
        let hits = self.index.search(&query, k)?;

        let evidence = hits
            .iter()
            .map(|hit| {
                self.store
                    .get(hit.position)
                    .map(|record| EvidenceItem::from_record(record, hit.score))
                    .ok_or(AppError::CorpusMismatch {
                        records: self.store.len(),
                        vectors: self.index.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        metrics::record_retrieval(start.elapsed().as_secs_f64(), evidence.len());
        debug!(
            k,
            hits = evidence.len(),
            top_score = evidence.first().map(|e| e.score),
            "Evidence retrieved"
        );

        Ok(evidence)
    }
}
