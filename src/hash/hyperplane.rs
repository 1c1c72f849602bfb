//! Random hyperplane hashing (SimHash) for cosine similarity.
//!
//! Each function draws a direction `r` with i.i.d. standard normal components
//! and maps `v` to 1 when `r · v >= 0`, else 0. For two vectors at angle θ,
//! `P[h(u) = h(v)] = 1 - θ / π`.

use ndarray::{Array1, ArrayView1};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;

use super::{HashFamily, HashFunction};
use crate::error::{LshError, Result};
use crate::vector::Vector;

/// Angle-preserving hash family over d-dimensional vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosineFamily {
    dimension: usize,
}

impl CosineFamily {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl HashFamily for CosineFamily {
    type Function = RandomHyperplane;

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> RandomHyperplane {
        RandomHyperplane {
            direction: Array1::random_using(self.dimension, StandardNormal, rng),
        }
    }
}

/// A single sampled hyperplane through the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomHyperplane {
    direction: Array1<f32>,
}

impl RandomHyperplane {
    /// Use a fixed direction instead of a sampled one.
    pub fn from_direction(direction: Vec<f32>) -> Self {
        Self {
            direction: Array1::from(direction),
        }
    }

    pub fn direction(&self) -> &[f32] {
        // Owned 1-D arrays are always contiguous
        self.direction.as_slice().unwrap_or(&[])
    }

    /// Signed projection of `vector` onto the normal of the hyperplane.
    pub fn project(&self, vector: &Vector) -> Result<f32> {
        if vector.dimension() != self.direction.len() {
            return Err(LshError::DimensionMismatch {
                expected: self.direction.len(),
                actual: vector.dimension(),
            });
        }
        Ok(self.direction.dot(&ArrayView1::from(vector.as_slice())))
    }
}

impl HashFunction for RandomHyperplane {
    fn dimension(&self) -> usize {
        self.direction.len()
    }

    fn hash(&self, vector: &Vector) -> Result<u64> {
        Ok(u64::from(self.project(vector)? >= 0.0))
    }
}
