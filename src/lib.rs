//! # MIPS LSH
//!
//! Approximate top-K recommendation by maximum inner product search.
//!
//! This library provides:
//! - Random hyperplane (sign) hashing for cosine similarity
//! - Multi-table LSH indexes with exact re-ranking of candidates
//! - The Xbox transform, reducing inner-product search to cosine search
//! - Precision/recall evaluation against an exact baseline
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mips_lsh::{Corpus, LshParams, MipsIndex, RetrievalConfig, Vector};
//!
//! // Item embeddings from a trained model
//! let items = Corpus::from_vectors(vec![
//!     (1, vec![3.0, 4.0]),
//!     (2, vec![1.0, 0.0]),
//!     (3, vec![0.0, 2.0]),
//! ])
//! .unwrap();
//!
//! let config = RetrievalConfig {
//!     lsh: LshParams::new(4, 8).with_seed(7),
//!     ..RetrievalConfig::default()
//! };
//! let index = MipsIndex::build(Arc::new(items), &config).unwrap();
//!
//! // Top items for a user vector
//! let result = index.query(&Vector::new(vec![0.2, 1.0]), 2).unwrap();
//! assert!(result.len() <= 2);
//! assert!(result.touched_fraction() <= 1.0);
//! ```

pub mod config;
pub mod corpus;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod flat_index;
pub mod hash;
pub mod index;
pub mod lsh;
pub mod metrics;
pub mod mips;
pub mod server;
pub mod similarity;
pub mod table;
pub mod vector;
pub mod xbox;

pub use config::{LshParams, RetrievalConfig};
pub use corpus::{Corpus, ItemId, UserId};
pub use dataset::{Dataset, SyntheticConfig};
pub use error::{LshError, Result};
pub use evaluation::{Comparison, Evaluator, GroundTruth, RetrievalMetrics, SweepPoint};
pub use flat_index::FlatIndex;
pub use hash::{CompositeKey, CosineFamily, HashFamily, HashFunction, RandomHyperplane};
pub use index::{QueryResult, Retriever, ScoredItem};
pub use lsh::{IndexStats, LshIndex};
pub use metrics::MetricsCollector;
pub use mips::MipsIndex;
pub use similarity::{Similarity, SimilarityFunction};
pub use table::HashTable;
pub use vector::Vector;
pub use xbox::XboxTransform;
