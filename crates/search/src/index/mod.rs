//! Exact cosine-similarity index
//!
//! Every stored row is L2-normalised at build time and every query is
//! normalised the same way, so the inner product of a query with a row is
//! their cosine similarity. Search is exhaustive (flat), which keeps results
//! exact and reproducible.

mod snapshot;

pub use snapshot::{IndexSnapshot, SNAPSHOT_VERSION};

use newsverify_common::errors::{AppError, Result};
use std::cmp::Ordering;

/// One search result: a corpus position and its cosine similarity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Flat inner-product index over unit-length vectors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityIndex {
    dimension: usize,
    /// Row-major storage, `count * dimension` values
    data: Vec<f32>,
    count: usize,
}

/// L2 norm of a vector, or `None` when normalisation is undefined
fn l2_norm(vector: &[f32]) -> Option<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm.is_finite() && norm > 0.0 {
        Some(norm)
    } else {
        None
    }
}

/// Return a unit-length copy of `vector`, or `None` for zero / non-finite input
pub fn normalize(vector: &[f32]) -> Option<Vec<f32>> {
    let norm = l2_norm(vector)?;
    Some(vector.iter().map(|x| x / norm).collect())
}

/// Descending score, then ascending insertion position
fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.position.cmp(&b.position))
}

impl SimilarityIndex {
    /// Normalise and store every vector.
    ///
    /// All vectors must share one dimension; zero vectors are rejected with
    /// `DegenerateVector`. An empty input yields an empty index.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(dimension * vectors.len());

        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(AppError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            let norm = l2_norm(vector).ok_or(AppError::DegenerateVector { position })?;
            data.extend(vector.iter().map(|x| x / norm));
        }

        tracing::debug!(count = vectors.len(), dimension, "Similarity index built");

        Ok(Self {
            dimension,
            data,
            count: vectors.len(),
        })
    }

    /// Assemble an index from rows that are already unit length
    pub(crate) fn from_normalized(dimension: usize, data: Vec<f32>, count: usize) -> Self {
        debug_assert_eq!(data.len(), dimension * count);
        Self {
            dimension,
            data,
            count,
        }
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Dimension of stored vectors (0 for an empty index)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Normalised row at `position`
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.count {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension.max(1)).take(self.count)
    }

    /// Exact top-`k` search by cosine similarity.
    ///
    /// Results are ordered by descending score; equal scores keep ascending
    /// insertion order. A `k` larger than the index returns every row.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Err(AppError::EmptyIndex);
        }
        if k == 0 {
            return Err(AppError::InvalidQuery {
                message: "k must be at least 1".into(),
            });
        }
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let query = normalize(query).ok_or_else(|| AppError::InvalidQuery {
            message: "query vector has zero or non-finite norm".into(),
        })?;

        let mut hits: Vec<SearchHit> = self
            .rows()
            .enumerate()
            .map(|(position, row)| {
                let dot: f32 = row.iter().zip(&query).map(|(a, b)| a * b).sum();
                // `+ 0.0` folds -0.0 into 0.0 so `total_cmp` sees one zero
                SearchHit {
                    position,
                    score: dot.clamp(-1.0, 1.0) + 0.0,
                }
            })
            .collect();

        let k = k.min(hits.len());
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, rank_order);
            hits.truncate(k);
        }
        hits.sort_by(rank_order);

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_build_normalizes_rows() {
        let index = SimilarityIndex::build(&[vec![3.0, 4.0], vec![0.0, 2.0]]).unwrap();
        let row = index.vector(0).unwrap();
        assert!(approx(row[0], 0.6));
        assert!(approx(row[1], 0.8));
        assert_eq!(index.vector(1).unwrap(), &[0.0, 1.0]);
        assert!(index.vector(2).is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let vectors = vec![vec![1.0, 2.0, 3.0], vec![-1.0, 0.5, 0.0]];
        let a = SimilarityIndex::build(&vectors).unwrap();
        let b = SimilarityIndex::build(&vectors).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_vector_rejected() {
        let err = SimilarityIndex::build(&[vec![1.0, 0.0], vec![0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, AppError::DegenerateVector { position: 1 }));
    }

    #[test]
    fn test_non_finite_vector_rejected() {
        let err = SimilarityIndex::build(&[vec![f32::NAN, 1.0]]).unwrap_err();
        assert!(matches!(err, AppError::DegenerateVector { position: 0 }));
    }

    #[test]
    fn test_ragged_vectors_rejected() {
        let err = SimilarityIndex::build(&[vec![1.0, 0.0], vec![1.0, 0.0, 0.0]]).unwrap_err();
        assert!(matches!(
            err,
            AppError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_empty_index_search_fails() {
        let index = SimilarityIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        assert!(matches!(
            index.search(&[1.0, 0.0], 3),
            Err(AppError::EmptyIndex)
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = SimilarityIndex::build(&[vec![1.0, 0.0]]).unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1),
            Err(AppError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_k_rejected() {
        let index = SimilarityIndex::build(&[vec![1.0, 0.0]]).unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0], 0),
            Err(AppError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_query_is_normalized() {
        let index = SimilarityIndex::build(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let hits = index.search(&[10.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].position, 0);
        assert!(approx(hits[0].score, 1.0));
    }

    #[test]
    fn test_opposite_direction_scores_minus_one() {
        let index = SimilarityIndex::build(&[vec![1.0, 0.0], vec![-1.0, 0.0]]).unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[1].position, 1);
        assert!(approx(hits[1].score, -1.0));
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let index = SimilarityIndex::build(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let hits = index.search(&[1.0, 1.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_signed_zero_scores_tie_by_position() {
        let index = SimilarityIndex::build(&[vec![-0.0, 1.0], vec![0.0, 1.0]]).unwrap();
        let hits = index.search(&[1.0, -0.0], 2).unwrap();

        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert!(hits.iter().all(|h| h.score == 0.0 && h.score.is_sign_positive()));
    }

    #[test]
    fn test_ties_break_by_insertion_position() {
        let index = SimilarityIndex::build(&[
            vec![0.0, 1.0],
            vec![2.0, 0.0],
            vec![1.0, 0.0],
            vec![5.0, 0.0],
        ])
        .unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![1, 2]);
    }
}
