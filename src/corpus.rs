//! In-memory id → vector mapping shared read-only by every phase

use crate::error::{LshError, Result};
use crate::vector::Vector;
use std::collections::BTreeMap;

/// Identifier of an item in the corpus
pub type ItemId = u64;

/// Identifier of a user (query vector)
pub type UserId = u64;

/// A fixed-dimension collection of embeddings keyed by id.
///
/// Used for the item corpus and for the batch of user (query) vectors.
/// Iteration is in ascending id order, which keeps index construction and
/// evaluation reproducible.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    vectors: BTreeMap<u64, Vector>,
    /// Enforced vector dimension
    dimension: Option<usize>,
}

impl Corpus {
    /// Create an empty corpus; the dimension is fixed by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a corpus from (id, vector) pairs.
    pub fn from_vectors<I, V>(vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u64, V)>,
        V: Into<Vector>,
    {
        let mut corpus = Corpus::new();
        for (id, v) in vectors {
            corpus.insert(id, v.into())?;
        }
        Ok(corpus)
    }

    /// Insert a vector, replacing any previous vector with the same id.
    pub fn insert(&mut self, id: u64, vector: Vector) -> Result<()> {
        let dim = vector.dimension();
        if dim == 0 {
            return Err(LshError::InvalidVector {
                reason: format!("vector {} has no components", id),
            });
        }
        if !vector.is_finite() {
            return Err(LshError::InvalidVector {
                reason: format!("vector {} has a non-finite component", id),
            });
        }

        // Check dimension consistency
        if let Some(expected_dim) = self.dimension {
            if dim != expected_dim {
                return Err(LshError::DimensionMismatch {
                    expected: expected_dim,
                    actual: dim,
                });
            }
        } else {
            self.dimension = Some(dim);
        }

        self.vectors.insert(id, vector);
        Ok(())
    }

    /// Get a vector by id
    pub fn get(&self, id: u64) -> Option<&Vector> {
        self.vectors.get(&id)
    }

    /// Get a vector by id or fail with `VectorNotFound`
    pub fn require(&self, id: u64) -> Result<&Vector> {
        self.get(id).ok_or(LshError::VectorNotFound { id })
    }

    pub fn contains(&self, id: u64) -> bool {
        self.vectors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension of the stored vectors (if any)
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Iterate over (id, vector) pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Vector)> {
        self.vectors.iter().map(|(&id, v)| (id, v))
    }

    /// All ids in ascending order
    pub fn ids(&self) -> Vec<u64> {
        self.vectors.keys().copied().collect()
    }

    /// Largest Euclidean norm over all vectors, 0.0 when empty.
    ///
    /// Computed in f64; the norm of a finite f32 vector may exceed `f32::MAX`.
    pub fn max_norm(&self) -> f64 {
        self.vectors
            .values()
            .map(|v| v.squared_norm_f64().sqrt())
            .fold(0.0_f64, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_insert_and_get() {
        let mut corpus = Corpus::new();
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        corpus.insert(7, v.clone()).unwrap();

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get(7), Some(&v));
        assert_eq!(corpus.dimension(), Some(3));
        assert!(matches!(
            corpus.require(8),
            Err(LshError::VectorNotFound { id: 8 })
        ));
    }

    #[test]
    fn test_dimension_consistency() {
        let mut corpus = Corpus::new();
        corpus.insert(1, Vector::new(vec![1.0, 2.0, 3.0])).unwrap();

        let result = corpus.insert(2, Vector::new(vec![1.0, 2.0]));
        assert!(matches!(result, Err(LshError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_rejects_non_finite_and_empty() {
        let mut corpus = Corpus::new();
        assert!(matches!(
            corpus.insert(1, Vector::new(vec![f32::NAN, 1.0])),
            Err(LshError::InvalidVector { .. })
        ));
        assert!(matches!(
            corpus.insert(1, Vector::new(vec![])),
            Err(LshError::InvalidVector { .. })
        ));
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_iteration_is_ordered() {
        let corpus =
            Corpus::from_vectors(vec![(3, vec![1.0]), (1, vec![2.0]), (2, vec![3.0])]).unwrap();
        assert_eq!(corpus.ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_max_norm() {
        let corpus =
            Corpus::from_vectors(vec![(1, vec![3.0, 4.0]), (2, vec![1.0, 0.0])]).unwrap();
        assert_relative_eq!(corpus.max_norm(), 5.0, epsilon = 1e-6);
        assert_eq!(Corpus::new().max_norm(), 0.0);
    }
}
