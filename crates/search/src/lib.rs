//! NewsVerify Search
//!
//! Exact nearest-neighbour retrieval over a fixed, embedded news corpus:
//! - Embedding store (records and vectors, position-aligned)
//! - Flat cosine-similarity index with snapshot persistence
//! - Retriever joining search hits back to records

pub mod index;
pub mod loader;
pub mod retriever;
pub mod store;

pub use index::{normalize, IndexSnapshot, SearchHit, SimilarityIndex};
pub use loader::{load_corpus, LoadedCorpus};
pub use retriever::Retriever;
pub use store::EmbeddingStore;
