//! A single LSH hash table: k hash functions and the buckets they induce.

use std::collections::HashMap;

use crate::corpus::{Corpus, ItemId};
use crate::error::{LshError, Result};
use crate::hash::{check_key_width, CompositeKey, HashFunction};
use crate::vector::Vector;

/// Buckets of item ids keyed by the composite key of one function draw.
///
/// Built once over the whole corpus and read-only afterwards.
#[derive(Debug)]
pub struct HashTable<F> {
    functions: Vec<F>,
    buckets: HashMap<CompositeKey, Vec<ItemId>>,
}

impl<F: HashFunction> HashTable<F> {
    /// Hash every corpus item into its bucket.
    ///
    /// Items are visited once each, in ascending id order, so every bucket
    /// lists its ids in ascending order.
    pub fn build(corpus: &Corpus, functions: Vec<F>) -> Result<Self> {
        if functions.is_empty() {
            return Err(LshError::config("a hash table needs at least one hash function"));
        }
        let code_bits = functions[0].code_bits();
        if functions.iter().any(|f| f.code_bits() != code_bits) {
            return Err(LshError::config(
                "every hash function in a table must emit codes of the same width",
            ));
        }
        check_key_width(functions.len(), code_bits)?;

        let dimension = functions[0].dimension();
        if let Some(f) = functions.iter().find(|f| f.dimension() != dimension) {
            return Err(LshError::DimensionMismatch {
                expected: dimension,
                actual: f.dimension(),
            });
        }

        let mut buckets: HashMap<CompositeKey, Vec<ItemId>> = HashMap::new();
        for (id, vector) in corpus.iter() {
            let key = CompositeKey::compute(&functions, vector)?;
            buckets.entry(key).or_default().push(id);
        }

        Ok(Self { functions, buckets })
    }

    /// Composite key of `vector` under this table's functions.
    pub fn key(&self, vector: &Vector) -> Result<CompositeKey> {
        CompositeKey::compute(&self.functions, vector)
    }

    /// Ids in the bucket for `key`; empty when no item hashed there.
    pub fn lookup(&self, key: CompositeKey) -> &[ItemId] {
        self.buckets.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Ids sharing a bucket with `vector`.
    pub fn probe(&self, vector: &Vector) -> Result<&[ItemId]> {
        Ok(self.lookup(self.key(vector)?))
    }

    pub fn functions(&self) -> &[F] {
        &self.functions
    }

    /// Number of non-empty buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Size of the largest bucket
    pub fn max_bucket_len(&self) -> usize {
        self.buckets.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Total number of ids stored across buckets (equals corpus size)
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::RandomHyperplane;

    fn corpus() -> Corpus {
        Corpus::from_vectors(vec![
            (1, vec![1.0, 0.0]),
            (2, vec![0.0, 1.0]),
            (3, vec![0.7, 0.7]),
        ])
        .unwrap()
    }

    #[test]
    fn test_build_visits_every_item_once() {
        let table = HashTable::build(
            &corpus(),
            vec![RandomHyperplane::from_direction(vec![1.0, -1.0])],
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.bucket_count(), 2);
        assert_eq!(table.max_bucket_len(), 2);
    }

    #[test]
    fn test_lookup() {
        let table = HashTable::build(
            &corpus(),
            vec![RandomHyperplane::from_direction(vec![1.0, -1.0])],
        )
        .unwrap();
        assert_eq!(table.lookup(CompositeKey::pack(vec![1], 1)), &[1, 3]);
        assert_eq!(table.lookup(CompositeKey::pack(vec![0], 1)), &[2]);
        assert!(table.lookup(CompositeKey::pack(vec![1, 1], 1)).is_empty());
    }

    #[test]
    fn test_probe() {
        let table = HashTable::build(
            &corpus(),
            vec![
                RandomHyperplane::from_direction(vec![1.0, -1.0]),
                RandomHyperplane::from_direction(vec![1.0, 0.0]),
            ],
        )
        .unwrap();
        let hits = table.probe(&Vector::new(vec![2.0, 0.1])).unwrap();
        assert_eq!(hits, &[1, 3]);
    }

    #[test]
    fn test_rejects_empty_function_list() {
        let result = HashTable::<RandomHyperplane>::build(&corpus(), vec![]);
        assert!(matches!(result, Err(LshError::InvalidConfig { .. })));
    }

    /// Two-bit codes: quadrant of the first two components.
    #[derive(Debug)]
    struct Quadrant;

    impl HashFunction for Quadrant {
        fn dimension(&self) -> usize {
            2
        }

        fn code_bits(&self) -> u32 {
            2
        }

        fn hash(&self, vector: &Vector) -> Result<u64> {
            let v = vector.as_slice();
            Ok(u64::from(v[0] >= 0.0) | (u64::from(v[1] >= 0.0) << 1))
        }
    }

    /// Functions of different code widths in one list.
    #[derive(Debug)]
    enum Mixed {
        Sign(RandomHyperplane),
        Quadrant(Quadrant),
    }

    impl HashFunction for Mixed {
        fn dimension(&self) -> usize {
            match self {
                Mixed::Sign(f) => f.dimension(),
                Mixed::Quadrant(f) => f.dimension(),
            }
        }

        fn code_bits(&self) -> u32 {
            match self {
                Mixed::Sign(f) => f.code_bits(),
                Mixed::Quadrant(f) => f.code_bits(),
            }
        }

        fn hash(&self, vector: &Vector) -> Result<u64> {
            match self {
                Mixed::Sign(f) => f.hash(vector),
                Mixed::Quadrant(f) => f.hash(vector),
            }
        }
    }

    #[test]
    fn test_wide_codes_pack_without_collisions() {
        let table = HashTable::build(&corpus(), vec![Quadrant, Quadrant]).unwrap();
        // Every item has non-negative components
        assert_eq!(table.lookup(CompositeKey::pack(vec![3, 3], 2)), &[1, 2, 3]);
    }

    #[test]
    fn test_rejects_mixed_code_widths() {
        let result = HashTable::build(
            &corpus(),
            vec![
                Mixed::Sign(RandomHyperplane::from_direction(vec![1.0, -1.0])),
                Mixed::Quadrant(Quadrant),
            ],
        );
        assert!(matches!(result, Err(LshError::InvalidConfig { .. })));
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let result = HashTable::build(
            &corpus(),
            vec![RandomHyperplane::from_direction(vec![1.0, 0.0, 0.0])],
        );
        assert!(matches!(result, Err(LshError::DimensionMismatch { .. })));
    }
}
