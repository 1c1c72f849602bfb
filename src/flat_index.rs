//! Brute-force flat index: exact O(n) top-K baseline

use std::sync::Arc;

use crate::corpus::{Corpus, ItemId};
use crate::error::{LshError, Result};
use crate::index::{rank_candidates, QueryResult, Retriever};
use crate::similarity::Similarity;
use crate::vector::Vector;

/// A flat index that scores every item. Always touches the whole corpus.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    corpus: Arc<Corpus>,
    ids: Vec<ItemId>,
    similarity: Similarity,
}

impl FlatIndex {
    /// Exact index over `corpus` ranked by `similarity`.
    pub fn new(corpus: Arc<Corpus>, similarity: Similarity) -> Self {
        let ids = corpus.ids();
        Self {
            corpus,
            ids,
            similarity,
        }
    }

    /// Exact maximum inner product baseline.
    pub fn inner_product(corpus: Arc<Corpus>) -> Self {
        Self::new(corpus, Similarity::DotProduct)
    }

    pub fn similarity(&self) -> Similarity {
        self.similarity
    }
}

impl Retriever for FlatIndex {
    fn retrieve(&self, query: &Vector, k: usize) -> Result<QueryResult> {
        if let Some(expected) = self.corpus.dimension() {
            if query.dimension() != expected {
                return Err(LshError::DimensionMismatch {
                    expected,
                    actual: query.dimension(),
                });
            }
        }
        rank_candidates(&self.corpus, query, &self.ids, k, &self.similarity)
    }

    fn corpus_len(&self) -> usize {
        self.corpus.len()
    }
}
