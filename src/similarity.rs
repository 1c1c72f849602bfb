//! Similarity functions used to re-rank LSH candidates

use crate::error::{LshError, Result};
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// An exact similarity score between a query and an item (higher is better).
///
/// Hash tables only filter candidates; the final order always comes from a
/// `SimilarityFunction`.
pub trait SimilarityFunction: Send + Sync {
    /// Score `item` against `query`.
    fn score(&self, query: &Vector, item: &Vector) -> Result<f32>;
}

/// Built-in similarity metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    /// Inner product
    DotProduct,
    /// Cosine of the angle between the vectors
    Cosine,
}

impl SimilarityFunction for Similarity {
    fn score(&self, query: &Vector, item: &Vector) -> Result<f32> {
        if !query.has_same_dimension(item) {
            return Err(LshError::DimensionMismatch {
                expected: item.dimension(),
                actual: query.dimension(),
            });
        }

        match self {
            Similarity::DotProduct => Ok(dot_product(query, item)),
            Similarity::Cosine => Ok(cosine_similarity(query, item)),
        }
    }
}

/// Compute dot product of two vectors
pub fn dot_product(v1: &Vector, v2: &Vector) -> f32 {
    v1.as_slice()
        .iter()
        .zip(v2.as_slice().iter())
        .map(|(a, b)| a * b)
        .sum()
}

/// Compute cosine similarity of two vectors.
///
/// A zero vector has no direction; its similarity to anything is 0.
pub fn cosine_similarity(v1: &Vector, v2: &Vector) -> f32 {
    let norm1 = v1.norm();
    let norm2 = v2.norm();

    if norm1 == 0.0 || norm2 == 0.0 {
        return 0.0;
    }

    // Clamp to [-1, 1] to handle floating point errors
    (dot_product(v1, v2) / (norm1 * norm2)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dot_product() {
        let v1 = Vector::new(vec![1.0, 2.0, 3.0]);
        let v2 = Vector::new(vec![4.0, 5.0, 6.0]);
        assert_relative_eq!(dot_product(&v1, &v2), 32.0, epsilon = 1e-6);
        assert_relative_eq!(
            Similarity::DotProduct.score(&v1, &v2).unwrap(),
            32.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_cosine_identical() {
        let v1 = Vector::new(vec![1.0, 0.0, 0.0]);
        let v2 = Vector::new(vec![2.0, 0.0, 0.0]);
        assert_relative_eq!(cosine_similarity(&v1, &v2), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let v1 = Vector::new(vec![1.0, 0.0, 0.0]);
        let v2 = Vector::new(vec![0.0, 1.0, 0.0]);
        assert_relative_eq!(cosine_similarity(&v1, &v2), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let v1 = Vector::new(vec![1.0, 0.0, 0.0]);
        let v2 = Vector::new(vec![-1.0, 0.0, 0.0]);
        assert_relative_eq!(
            Similarity::Cosine.score(&v1, &v2).unwrap(),
            -1.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_cosine_zero_vector() {
        let v1 = Vector::new(vec![0.0, 0.0]);
        let v2 = Vector::new(vec![1.0, 1.0]);
        assert_eq!(cosine_similarity(&v1, &v2), 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let v1 = Vector::new(vec![1.0, 2.0]);
        let v2 = Vector::new(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            Similarity::DotProduct.score(&v1, &v2),
            Err(LshError::DimensionMismatch { .. })
        ));
    }
}
