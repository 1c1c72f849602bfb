//! End-to-end maximum inner product retrieval.
//!
//! Items are optionally augmented with the Xbox transform, hashed into an
//! [`LshIndex`] with random hyperplanes, and the resulting candidates are
//! re-ranked by the true inner product against the original item vectors.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::corpus::Corpus;
use crate::error::{LshError, Result};
use crate::hash::CosineFamily;
use crate::index::{check_top_k, rank_candidates, QueryResult, Retriever};
use crate::lsh::{IndexStats, LshIndex};
use crate::similarity::Similarity;
use crate::vector::Vector;
use crate::xbox::XboxTransform;

/// Approximate top-K inner product search over a frozen item corpus.
#[derive(Debug)]
pub struct MipsIndex {
    items: Arc<Corpus>,
    transform: Option<XboxTransform>,
    lsh: LshIndex,
    config: RetrievalConfig,
}

impl MipsIndex {
    pub fn build(items: Arc<Corpus>, config: &RetrievalConfig) -> Result<Self> {
        config.validate()?;
        if items.is_empty() {
            return Err(LshError::config("cannot build an index over an empty corpus"));
        }

        let (transform, hashed) = if config.use_xbox_transform {
            let transform = XboxTransform::fit(&items)?;
            let hashed = Arc::new(transform.transform_corpus(&items)?);
            (Some(transform), hashed)
        } else {
            (None, Arc::clone(&items))
        };

        let family = CosineFamily::new(hashed.dimension().unwrap_or(0));
        let lsh = LshIndex::build(hashed, &family, &config.lsh)?;

        let mut config = config.clone();
        config.lsh.seed = lsh.seed();

        Ok(Self {
            items,
            transform,
            lsh,
            config,
        })
    }

    /// Top-`k` items by inner product among the LSH candidates.
    pub fn query(&self, query: &Vector, k: usize) -> Result<QueryResult> {
        check_top_k(k)?;
        if let Some(expected) = self.items.dimension() {
            if query.dimension() != expected {
                return Err(LshError::DimensionMismatch {
                    expected,
                    actual: query.dimension(),
                });
            }
        }

        let hashed_query = match &self.transform {
            Some(transform) => Cow::Owned(transform.transform_query(query)?),
            None => Cow::Borrowed(query),
        };
        let candidates = self.lsh.candidates(&hashed_query)?;
        debug!(candidates = candidates.len(), k, "mips query");

        rank_candidates(&self.items, query, &candidates, k, &Similarity::DotProduct)
    }

    /// Query with the configured K.
    pub fn query_default(&self, query: &Vector) -> Result<QueryResult> {
        self.query(query, self.config.top_k)
    }

    pub fn items(&self) -> &Arc<Corpus> {
        &self.items
    }

    pub fn transform(&self) -> Option<&XboxTransform> {
        self.transform.as_ref()
    }

    pub fn lsh(&self) -> &LshIndex {
        &self.lsh
    }

    /// Configuration the index was built with; the seed is always set.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn stats(&self) -> IndexStats {
        self.lsh.stats()
    }
}

impl Retriever for MipsIndex {
    fn retrieve(&self, query: &Vector, k: usize) -> Result<QueryResult> {
        self.query(query, k)
    }

    fn corpus_len(&self) -> usize {
        self.items.len()
    }
}
