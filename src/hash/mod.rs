//! Hash families and composite bucket keys.
//!
//! A [`HashFamily`] samples independent [`HashFunction`]s; `k` of them are
//! packed into one [`CompositeKey`] per table. Two vectors share a bucket in
//! a table only when all `k` codes agree.

pub mod hyperplane;

pub use hyperplane::{CosineFamily, RandomHyperplane};

use rand::Rng;

use crate::error::{LshError, Result};
use crate::vector::Vector;

/// Width of a composite key in bits.
pub const KEY_BITS: u32 = u64::BITS;

/// One sampled hash function. Its parameters are fixed at construction.
pub trait HashFunction: Send + Sync {
    /// Dimension of the vectors this function accepts.
    fn dimension(&self) -> usize;

    /// Number of bits one output code occupies.
    fn code_bits(&self) -> u32 {
        1
    }

    /// Hash a vector to a code in `0..2^code_bits`.
    ///
    /// Fails with `DimensionMismatch` when the vector length differs from
    /// [`HashFunction::dimension`].
    fn hash(&self, vector: &Vector) -> Result<u64>;
}

/// A distribution over hash functions for one similarity measure.
pub trait HashFamily: Send + Sync {
    type Function: HashFunction;

    fn dimension(&self) -> usize;

    /// Bits per code of every function this family produces.
    fn code_bits(&self) -> u32 {
        1
    }

    /// Draw one function.
    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Function;

    /// Draw `n` independent functions.
    fn sample_n<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<Self::Function> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

/// Bucket key: k hash codes packed as `sum(code_j << (j * code_bits))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey(u64);

impl CompositeKey {
    /// Pack codes in order; code `j` lands at bit offset `j * code_bits`.
    pub fn pack<I>(codes: I, code_bits: u32) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mask = if code_bits >= KEY_BITS {
            u64::MAX
        } else {
            (1u64 << code_bits) - 1
        };
        let key = codes
            .into_iter()
            .enumerate()
            .fold(0u64, |key, (j, code)| {
                let shifted = (code & mask).checked_shl(j as u32 * code_bits).unwrap_or(0);
                key | shifted
            });
        CompositeKey(key)
    }

    /// Evaluate every function on `vector` and pack the results.
    pub fn compute<F: HashFunction>(functions: &[F], vector: &Vector) -> Result<Self> {
        let code_bits = functions.first().map(|f| f.code_bits()).unwrap_or(1);
        let codes = functions
            .iter()
            .map(|f| f.hash(vector))
            .collect::<Result<Vec<u64>>>()?;
        Ok(Self::pack(codes, code_bits))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Reject function lists whose packed key would not fit in [`KEY_BITS`].
pub(crate) fn check_key_width(num_functions: usize, code_bits: u32) -> Result<()> {
    let total = num_functions as u64 * code_bits as u64;
    if total > KEY_BITS as u64 {
        return Err(LshError::config(format!(
            "{} hash functions of {} bit(s) need a {}-bit key, at most {} supported",
            num_functions, code_bits, total, KEY_BITS
        )));
    }
    Ok(())
}
