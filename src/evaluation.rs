//! Retrieval quality and cost against held-out preferences.
//!
//! - precision@K = |predicted ∩ truth| / K
//! - recall@K = |predicted ∩ truth| / |truth|
//!
//! Users with no held-out preferences are left out of both averages and
//! counted in `skipped_queries`. Relative metrics always divide by an exact
//! linear-scan baseline over the same users and the same K.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RetrievalConfig;
use crate::corpus::{Corpus, ItemId, UserId};
use crate::error::{LshError, Result};
use crate::flat_index::FlatIndex;
use crate::index::Retriever;
use crate::mips::MipsIndex;

/// Items each user is known to prefer. Never used to build an index.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    preferences: HashMap<UserId, HashSet<ItemId>>,
}

impl GroundTruth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add preferred items for `user`, merging with earlier ones.
    pub fn insert<I>(&mut self, user: UserId, items: I)
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.preferences.entry(user).or_default().extend(items);
    }

    pub fn get(&self, user: UserId) -> Option<&HashSet<ItemId>> {
        self.preferences.get(&user)
    }

    /// Iterate over (user, preferred items) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (UserId, &HashSet<ItemId>)> {
        self.preferences.iter().map(|(&user, items)| (user, items))
    }

    /// Number of users with an entry
    pub fn len(&self) -> usize {
        self.preferences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty()
    }
}

impl FromIterator<(UserId, Vec<ItemId>)> for GroundTruth {
    fn from_iter<T: IntoIterator<Item = (UserId, Vec<ItemId>)>>(iter: T) -> Self {
        let mut truth = GroundTruth::new();
        for (user, items) in iter {
            truth.insert(user, items);
        }
        truth
    }
}

/// precision@K: hits among the first `k` predictions, divided by `k`.
pub fn precision_at_k(ground_truth: &HashSet<ItemId>, predicted: &[ItemId], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .take(k)
        .filter(|id| ground_truth.contains(id))
        .count();
    hits as f64 / k as f64
}

/// recall@K: hits among the first `k` predictions, divided by the number of
/// preferred items. 0 when there are none.
pub fn recall_at_k(ground_truth: &HashSet<ItemId>, predicted: &[ItemId], k: usize) -> f64 {
    if ground_truth.is_empty() {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .take(k)
        .filter(|id| ground_truth.contains(id))
        .count();
    hits as f64 / ground_truth.len() as f64
}

/// Averaged quality and cost of one retriever over a query batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalMetrics {
    pub k: usize,
    pub precision: f64,
    pub recall: f64,
    /// Mean fraction of the corpus scored per query
    pub touched_fraction: f64,
    pub evaluated_queries: usize,
    pub skipped_queries: usize,
}

/// LSH metrics next to the exact baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub lsh: RetrievalMetrics,
    pub baseline: RetrievalMetrics,
    /// `None` when the baseline precision is 0
    pub relative_precision: Option<f64>,
    /// `None` when the baseline recall is 0
    pub relative_recall: Option<f64>,
}

impl Comparison {
    fn new(lsh: RetrievalMetrics, baseline: RetrievalMetrics) -> Self {
        let ratio = |a: f64, b: f64| if b > 0.0 { Some(a / b) } else { None };
        Self {
            relative_precision: ratio(lsh.precision, baseline.precision),
            relative_recall: ratio(lsh.recall, baseline.recall),
            lsh,
            baseline,
        }
    }
}

/// One (k, L) configuration of an accuracy/cost sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub num_bits: usize,
    pub num_tables: usize,
    pub comparison: Comparison,
}

/// Runs a batch of user queries against retrievers and averages the metrics.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    users: &'a Corpus,
    ground_truth: &'a GroundTruth,
    k: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(users: &'a Corpus, ground_truth: &'a GroundTruth, k: usize) -> Result<Self> {
        if k < 1 {
            return Err(LshError::config("K must be at least 1"));
        }
        Ok(Self {
            users,
            ground_truth,
            k,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Query every user with known preferences, in parallel.
    pub fn evaluate<R>(&self, retriever: &R) -> Result<RetrievalMetrics>
    where
        R: Retriever + ?Sized,
    {
        let users: Vec<_> = self.users.iter().collect();
        let per_query = users
            .par_iter()
            .map(|&(user, vector)| -> Result<Option<(f64, f64, f64)>> {
                let truth = match self.ground_truth.get(user) {
                    Some(truth) if !truth.is_empty() => truth,
                    _ => return Ok(None),
                };
                let result = retriever.retrieve(vector, self.k)?;
                let predicted = result.ids();
                Ok(Some((
                    precision_at_k(truth, &predicted, self.k),
                    recall_at_k(truth, &predicted, self.k),
                    result.touched_fraction(),
                )))
            })
            .collect::<Result<Vec<_>>>()?;

        let evaluated: Vec<(f64, f64, f64)> = per_query.iter().flatten().copied().collect();
        let skipped_queries = per_query.len() - evaluated.len();
        if skipped_queries > 0 {
            warn!(
                skipped = skipped_queries,
                "users without held-out preferences left out of the averages"
            );
        }

        let mean = |select: fn(&(f64, f64, f64)) -> f64| {
            if evaluated.is_empty() {
                0.0
            } else {
                evaluated.iter().map(select).sum::<f64>() / evaluated.len() as f64
            }
        };

        Ok(RetrievalMetrics {
            k: self.k,
            precision: mean(|e| e.0),
            recall: mean(|e| e.1),
            touched_fraction: mean(|e| e.2),
            evaluated_queries: evaluated.len(),
            skipped_queries,
        })
    }

    /// Evaluate `lsh` and `baseline` on the same batch and take ratios.
    pub fn compare<A, B>(&self, lsh: &A, baseline: &B) -> Result<Comparison>
    where
        A: Retriever + ?Sized,
        B: Retriever + ?Sized,
    {
        let lsh = self.evaluate(lsh)?;
        let baseline = self.evaluate(baseline)?;
        info!(
            precision = lsh.precision,
            recall = lsh.recall,
            touched = lsh.touched_fraction,
            baseline_precision = baseline.precision,
            baseline_recall = baseline.recall,
            "evaluated retriever against baseline"
        );
        Ok(Comparison::new(lsh, baseline))
    }
}

/// Build and evaluate a [`MipsIndex`] for every (k, L) pair in `grid`.
///
/// The exact inner product baseline is computed once and shared by every
/// point. All other settings come from `base`.
pub fn sweep(
    items: &Arc<Corpus>,
    evaluator: &Evaluator<'_>,
    grid: &[(usize, usize)],
    base: &RetrievalConfig,
) -> Result<Vec<SweepPoint>> {
    let baseline = evaluator.evaluate(&FlatIndex::inner_product(Arc::clone(items)))?;

    grid.iter()
        .map(|&(num_bits, num_tables)| {
            let mut config = base.clone();
            config.lsh.num_bits = num_bits;
            config.lsh.num_tables = num_tables;
            let index = MipsIndex::build(Arc::clone(items), &config)?;
            let lsh = evaluator.evaluate(&index)?;
            info!(
                bits = num_bits,
                tables = num_tables,
                precision = lsh.precision,
                recall = lsh.recall,
                touched = lsh.touched_fraction,
                "sweep point"
            );
            Ok(SweepPoint {
                num_bits,
                num_tables,
                comparison: Comparison::new(lsh, baseline.clone()),
            })
        })
        .collect()
}
