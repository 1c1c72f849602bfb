//! Vector type and operations

use crate::error::{Result, LshError};
use serde::{Deserialize, Serialize};

/// A user or item embedding in d-dimensional space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    /// Create a new vector from a Vec<f32>
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimension of the vector
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Get the underlying data as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Check if this vector has the same dimension as another
    pub fn has_same_dimension(&self, other: &Vector) -> bool {
        self.dimension() == other.dimension()
    }

    /// Whether every component is a finite real number
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Squared L2 norm
    pub fn squared_norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum()
    }

    /// Squared L2 norm accumulated in f64, finite for any finite vector
    pub fn squared_norm_f64(&self) -> f64 {
        self.data.iter().map(|&x| f64::from(x) * f64::from(x)).sum()
    }

    /// Compute the L2 norm (magnitude) of the vector
    pub fn norm(&self) -> f32 {
        self.squared_norm().sqrt()
    }

    /// Inner product with another vector of the same dimension
    pub fn dot(&self, other: &Vector) -> Result<f32> {
        if !self.has_same_dimension(other) {
            return Err(LshError::DimensionMismatch {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Copy of this vector with one extra trailing component
    pub fn augmented(&self, last: f32) -> Vector {
        let mut data = Vec::with_capacity(self.data.len() + 1);
        data.extend_from_slice(&self.data);
        data.push(last);
        Vector::new(data)
    }

    /// Parse a vector from a comma-separated string
    pub fn from_str(s: &str) -> Result<Self> {
        let data: Result<Vec<f32>> = s
            .split(',')
            .map(|x| {
                x.trim()
                    .parse::<f32>()
                    .map_err(|_| LshError::InvalidVector {
                        reason: format!("Invalid float: {}", x),
                    })
            })
            .collect();
        Ok(Vector::new(data?))
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_creation() {
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.dimension(), 3);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_vector_norm() {
        let v = Vector::new(vec![3.0, 4.0]);
        assert_relative_eq!(v.norm(), 5.0, epsilon = 1e-6);
        assert_relative_eq!(v.squared_norm(), 25.0, epsilon = 1e-6);
        assert_relative_eq!(v.squared_norm_f64(), 25.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wide_norm_does_not_overflow() {
        let v = Vector::new(vec![2e19, 0.0]);
        assert!(v.squared_norm().is_infinite());
        assert!(v.squared_norm_f64().is_finite());
        assert_relative_eq!(v.squared_norm_f64().sqrt(), 2e19, max_relative = 1e-6);
    }

    #[test]
    fn test_dot() {
        let v1 = Vector::new(vec![1.0, 2.0, 3.0]);
        let v2 = Vector::new(vec![4.0, 5.0, 6.0]);
        assert_relative_eq!(v1.dot(&v2).unwrap(), 32.0, epsilon = 1e-6);
    }

    #[test]
    fn test_augmented() {
        let v = Vector::new(vec![1.0, 2.0]);
        let a = v.augmented(0.5);
        assert_eq!(a.as_slice(), &[1.0, 2.0, 0.5]);
        assert_eq!(v.dimension(), 2);
    }

    #[test]
    fn test_is_finite() {
        assert!(Vector::new(vec![1.0, -2.0]).is_finite());
        assert!(!Vector::new(vec![1.0, f32::NAN]).is_finite());
        assert!(!Vector::new(vec![f32::INFINITY]).is_finite());
    }

    #[test]
    fn test_from_str() {
        let v = Vector::from_str("1.0, 2.0, 3.0").unwrap();
        assert_eq!(v.dimension(), 3);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0]);
        assert!(matches!(
            Vector::from_str("1.0,abc"),
            Err(LshError::InvalidVector { .. })
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let v1 = Vector::new(vec![1.0, 2.0]);
        let v2 = Vector::new(vec![1.0, 2.0, 3.0]);
        assert!(matches!(v1.dot(&v2), Err(LshError::DimensionMismatch { .. })));
    }
}
