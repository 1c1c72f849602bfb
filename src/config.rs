//! Index and retrieval configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LshError, Result};

/// Shape of an LSH index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LshParams {
    /// Hash functions per table (k). Higher = smaller buckets.
    pub num_bits: usize,
    /// Number of independent tables (L). Higher = more recall.
    pub num_tables: usize,
    /// Base seed for hash function sampling; drawn from entropy when unset.
    pub seed: Option<u64>,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            num_bits: 8,
            num_tables: 10,
            seed: None,
        }
    }
}

impl LshParams {
    pub fn new(num_bits: usize, num_tables: usize) -> Self {
        Self {
            num_bits,
            num_tables,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_bits < 1 {
            return Err(LshError::config("number of hash bits (k) must be at least 1"));
        }
        if self.num_tables < 1 {
            return Err(LshError::config("number of tables (L) must be at least 1"));
        }
        Ok(())
    }
}

/// Everything needed to build and query a [`crate::mips::MipsIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub lsh: LshParams,
    /// Result list length (K)
    pub top_k: usize,
    /// Reduce inner-product search to cosine search before hashing
    pub use_xbox_transform: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            lsh: LshParams::default(),
            top_k: 10,
            use_xbox_transform: true,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        self.lsh.validate()?;
        if self.top_k < 1 {
            return Err(LshError::config("K must be at least 1"));
        }
        Ok(())
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config: RetrievalConfig = serde_json::from_slice(&bytes)
            .map_err(|e| LshError::SerializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
