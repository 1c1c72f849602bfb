//! Vector sources: trained (or synthetic) user and item embeddings plus
//! held-out preferences.

pub mod embeddings;
pub mod synthetic;

pub use synthetic::SyntheticConfig;

use crate::corpus::Corpus;
use crate::error::{LshError, Result};
use crate::evaluation::GroundTruth;

/// Item corpus, user query vectors and held-out ground truth.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub items: Corpus,
    pub users: Corpus,
    pub ground_truth: GroundTruth,
}

impl Dataset {
    /// Check that users and items live in the same space.
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(LshError::config("dataset has no items"));
        }
        if let (Some(items), Some(users)) = (self.items.dimension(), self.users.dimension()) {
            if items != users {
                return Err(LshError::DimensionMismatch {
                    expected: items,
                    actual: users,
                });
            }
        }
        Ok(())
    }
}
