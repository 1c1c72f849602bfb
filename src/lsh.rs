//! Multi-table LSH index with exact re-ranking.
//!
//! L tables each own k functions drawn from a [`HashFamily`]. A query is
//! hashed into one bucket per table; the union of those buckets is the
//! candidate set, which is then scored exactly. The index never scores an
//! item outside the candidate set, so the candidate count is the cost of a
//! query.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::LshParams;
use crate::corpus::{Corpus, ItemId};
use crate::error::{LshError, Result};
use crate::hash::{check_key_width, HashFamily, HashFunction, RandomHyperplane};
use crate::index::{check_top_k, rank_candidates, QueryResult};
use crate::similarity::SimilarityFunction;
use crate::table::HashTable;
use crate::vector::Vector;

/// Summary of a built index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub num_tables: usize,
    pub num_bits: usize,
    pub dimension: usize,
    pub corpus_len: usize,
    pub total_buckets: usize,
    pub max_bucket_len: usize,
    pub mean_bucket_len: f64,
    pub seed: Option<u64>,
}

/// Build-once, query-many LSH index over a shared corpus.
#[derive(Debug)]
pub struct LshIndex<F = RandomHyperplane> {
    corpus: Arc<Corpus>,
    tables: Vec<HashTable<F>>,
    dimension: usize,
    num_bits: usize,
    /// Base seed the tables were sampled from; `None` for explicit functions.
    seed: Option<u64>,
}

/// RNG for table `table`, independent of how many tables or bits are built.
fn table_rng(seed: u64, table: usize) -> StdRng {
    let stream = (table as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(seed ^ stream)
}

fn corpus_dimension(corpus: &Corpus) -> Result<usize> {
    match corpus.dimension() {
        Some(dimension) if !corpus.is_empty() => Ok(dimension),
        _ => Err(LshError::config("cannot build an index over an empty corpus")),
    }
}

impl<F: HashFunction> LshIndex<F> {
    /// Sample `num_tables * num_bits` functions from `family` and hash the
    /// whole corpus into every table. Tables are built in parallel.
    pub fn build<H>(corpus: Arc<Corpus>, family: &H, params: &LshParams) -> Result<Self>
    where
        H: HashFamily<Function = F>,
    {
        params.validate()?;
        let dimension = corpus_dimension(&corpus)?;
        if family.dimension() != dimension {
            return Err(LshError::DimensionMismatch {
                expected: dimension,
                actual: family.dimension(),
            });
        }
        check_key_width(params.num_bits, family.code_bits())?;

        let seed = params.seed.unwrap_or_else(|| rand::thread_rng().gen());

        let tables = (0..params.num_tables)
            .into_par_iter()
            .map(|t| {
                let mut rng = table_rng(seed, t);
                let functions = family.sample_n(params.num_bits, &mut rng);
                HashTable::build(&corpus, functions)
            })
            .collect::<Result<Vec<_>>>()?;

        let index = Self {
            corpus,
            tables,
            dimension,
            num_bits: params.num_bits,
            seed: Some(seed),
        };

        let stats = index.stats();
        info!(
            tables = stats.num_tables,
            bits = stats.num_bits,
            items = stats.corpus_len,
            buckets = stats.total_buckets,
            seed,
            "built LSH index"
        );
        for (t, table) in index.tables.iter().enumerate() {
            debug!(
                table = t,
                buckets = table.bucket_count(),
                largest = table.max_bucket_len(),
                "table stats"
            );
        }

        Ok(index)
    }

    /// Build from caller-supplied functions, one list per table.
    ///
    /// Every list must have the same length (k).
    pub fn from_functions(corpus: Arc<Corpus>, tables: Vec<Vec<F>>) -> Result<Self> {
        let dimension = corpus_dimension(&corpus)?;
        let num_bits = match tables.first() {
            Some(functions) => functions.len(),
            None => return Err(LshError::config("number of tables (L) must be at least 1")),
        };
        if num_bits < 1 {
            return Err(LshError::config("number of hash bits (k) must be at least 1"));
        }
        if tables.iter().any(|functions| functions.len() != num_bits) {
            return Err(LshError::config(
                "every table must have the same number of hash functions",
            ));
        }
        if let Some(f) = tables.iter().flatten().find(|f| f.dimension() != dimension) {
            return Err(LshError::DimensionMismatch {
                expected: dimension,
                actual: f.dimension(),
            });
        }

        let tables = tables
            .into_iter()
            .map(|functions| HashTable::build(&corpus, functions))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            corpus,
            tables,
            dimension,
            num_bits,
            seed: None,
        })
    }

    /// Distinct ids sharing a bucket with `query` in at least one table,
    /// in ascending order.
    pub fn candidates(&self, query: &Vector) -> Result<Vec<ItemId>> {
        if query.dimension() != self.dimension {
            return Err(LshError::DimensionMismatch {
                expected: self.dimension,
                actual: query.dimension(),
            });
        }

        let mut candidates = BTreeSet::new();
        for table in &self.tables {
            candidates.extend(table.probe(query)?.iter().copied());
        }
        Ok(candidates.into_iter().collect())
    }

    /// Top-`k` items by exact `similarity` among the LSH candidates.
    ///
    /// An empty candidate set yields an empty result with `touched == 0`.
    pub fn query<S>(&self, query: &Vector, k: usize, similarity: &S) -> Result<QueryResult>
    where
        S: SimilarityFunction + ?Sized,
    {
        check_top_k(k)?;
        let candidates = self.candidates(query)?;
        debug!(candidates = candidates.len(), k, "lsh query");
        rank_candidates(&self.corpus, query, &candidates, k, similarity)
    }

    pub fn stats(&self) -> IndexStats {
        let total_buckets: usize = self.tables.iter().map(HashTable::bucket_count).sum();
        let max_bucket_len = self
            .tables
            .iter()
            .map(HashTable::max_bucket_len)
            .max()
            .unwrap_or(0);
        let mean_bucket_len = if total_buckets == 0 {
            0.0
        } else {
            (self.corpus.len() * self.tables.len()) as f64 / total_buckets as f64
        };

        IndexStats {
            num_tables: self.tables.len(),
            num_bits: self.num_bits,
            dimension: self.dimension,
            corpus_len: self.corpus.len(),
            total_buckets,
            max_bucket_len,
            mean_bucket_len,
            seed: self.seed,
        }
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    pub fn tables(&self) -> &[HashTable<F>] {
        &self.tables
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}
