//! Retriever trait and the shared re-ranking step

use serde::{Deserialize, Serialize};

use crate::corpus::{Corpus, ItemId};
use crate::error::{LshError, Result};
use crate::similarity::SimilarityFunction;
use crate::vector::Vector;

/// One ranked item with its exact similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub id: ItemId,
    pub score: f32,
}

/// Ranked top-K items for one query plus the cost of producing them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    /// At most K items, descending score, ties by ascending id
    pub items: Vec<ScoredItem>,
    /// Distinct corpus items scored for this query
    pub touched: usize,
    /// Corpus size at the time of the query
    pub corpus_len: usize,
}

impl QueryResult {
    /// Fraction of the corpus inspected, in `[0, 1]`.
    pub fn touched_fraction(&self) -> f64 {
        if self.corpus_len == 0 {
            return 0.0;
        }
        self.touched as f64 / self.corpus_len as f64
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Anything that answers top-K queries against an item corpus.
///
/// Implementations are immutable once built, so `retrieve` may run from many
/// threads at once.
pub trait Retriever: Send + Sync {
    /// Top-`k` items for `query`.
    fn retrieve(&self, query: &Vector, k: usize) -> Result<QueryResult>;

    /// Number of items the retriever was built over.
    fn corpus_len(&self) -> usize;
}

pub(crate) fn check_top_k(k: usize) -> Result<()> {
    if k < 1 {
        return Err(LshError::config("K must be at least 1"));
    }
    Ok(())
}

/// Score every candidate exactly and keep the best `k`.
///
/// Candidates must be distinct and present in `corpus`.
pub fn rank_candidates<S>(
    corpus: &Corpus,
    query: &Vector,
    candidates: &[ItemId],
    k: usize,
    similarity: &S,
) -> Result<QueryResult>
where
    S: SimilarityFunction + ?Sized,
{
    check_top_k(k)?;

    let mut items = candidates
        .iter()
        .map(|&id| {
            let vector = corpus.require(id)?;
            Ok(ScoredItem {
                id,
                score: similarity.score(query, vector)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    items.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    items.truncate(k);

    Ok(QueryResult {
        items,
        touched: candidates.len(),
        corpus_len: corpus.len(),
    })
}
