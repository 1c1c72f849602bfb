//! Xbox transform: reduce maximum inner product search to cosine search.
//!
//! With `M` the largest item norm, items become `P(y) = [y, sqrt(M² - |y|²)]`
//! and queries `Q(x) = [x, 0]`. Every transformed item has norm `M`, so
//! `cos(Q(x), P(y)) = x·y / (|x| M)` and, for a fixed query, ranking by cosine
//! on transformed vectors equals ranking by inner product on the originals.

use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::error::{LshError, Result};
use crate::vector::Vector;

/// Relative slack on `M²` treated as rounding rather than a norm violation.
const NORM_TOLERANCE: f64 = 1e-4;

/// A fitted transform. `M` is fixed at fit time; an item with a larger norm
/// needs a refit and a rebuild of any index over the transformed corpus.
///
/// Norms and the padding radicand are computed in f64, so `M²` cannot
/// overflow; `M` itself must fit in an f32 component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XboxTransform {
    max_norm: f64,
    dimension: usize,
}

impl XboxTransform {
    /// Compute `M` over the item corpus.
    pub fn fit(items: &Corpus) -> Result<Self> {
        let dimension = match items.dimension() {
            Some(dimension) if !items.is_empty() => dimension,
            _ => {
                return Err(LshError::config(
                    "cannot fit the Xbox transform on an empty corpus",
                ))
            }
        };
        let max_norm = items.max_norm();
        if !(max_norm as f32).is_finite() {
            return Err(LshError::InvalidVector {
                reason: format!(
                    "largest item norm {:e} does not fit in an f32 component",
                    max_norm
                ),
            });
        }
        info!(max_norm, items = items.len(), "fitted Xbox transform");
        Ok(Self {
            max_norm,
            dimension,
        })
    }

    pub fn max_norm(&self) -> f32 {
        self.max_norm as f32
    }

    /// Dimension of untransformed vectors; transformed ones have one more.
    pub fn input_dimension(&self) -> usize {
        self.dimension
    }

    pub fn output_dimension(&self) -> usize {
        self.dimension + 1
    }

    fn check_dimension(&self, vector: &Vector) -> Result<()> {
        if vector.dimension() != self.dimension {
            return Err(LshError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.dimension(),
            });
        }
        Ok(())
    }

    /// `P(y) = [y, sqrt(M² - |y|²)]`.
    ///
    /// A slightly negative radicand from rounding is clamped to zero. An item
    /// whose norm clearly exceeds `M` is rejected.
    pub fn transform_item(&self, item: &Vector) -> Result<Vector> {
        self.check_dimension(item)?;
        let bound = self.max_norm * self.max_norm;
        let radicand = bound - item.squared_norm_f64();
        if radicand < 0.0 {
            if -radicand > NORM_TOLERANCE * bound.max(f64::MIN_POSITIVE) {
                return Err(LshError::InvalidVector {
                    reason: format!(
                        "item norm {} exceeds the fitted maximum {}; refit and rebuild",
                        item.squared_norm_f64().sqrt(),
                        self.max_norm
                    ),
                });
            }
            debug!(radicand, "clamped negative Xbox radicand to zero");
        }
        Ok(item.augmented(radicand.max(0.0).sqrt() as f32))
    }

    /// `Q(x) = [x, 0]`.
    pub fn transform_query(&self, query: &Vector) -> Result<Vector> {
        self.check_dimension(query)?;
        Ok(query.augmented(0.0))
    }

    /// Transform every item, keeping ids.
    pub fn transform_corpus(&self, items: &Corpus) -> Result<Corpus> {
        let mut transformed = Corpus::new();
        for (id, item) in items.iter() {
            transformed.insert(id, self.transform_item(item)?)?;
        }
        Ok(transformed)
    }
}
