//! Reproducible synthetic factor model.
//!
//! Latent user and item factors are drawn from a standard normal; item rows
//! are scaled by a random factor so item norms differ (inner product and
//! cosine rankings disagree). The observed embeddings add Gaussian noise to
//! the latent ones, standing in for a trained model. A user's held-out
//! preferences are the top items by noise-free inner product.

use ndarray::Array2;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Dataset;
use crate::corpus::{Corpus, ItemId, UserId};
use crate::error::{LshError, Result};
use crate::evaluation::GroundTruth;
use crate::vector::Vector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub num_users: usize,
    pub num_items: usize,
    pub dimension: usize,
    /// Held-out preferred items per user
    pub relevant_per_user: usize,
    /// Standard deviation of the observation noise
    pub noise: f32,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_users: 200,
            num_items: 2000,
            dimension: 32,
            relevant_per_user: 10,
            noise: 0.1,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_users < 1 || self.num_items < 1 || self.dimension < 1 {
            return Err(LshError::config(
                "synthetic users, items and dimension must all be at least 1",
            ));
        }
        if self.relevant_per_user > self.num_items {
            return Err(LshError::config(format!(
                "{} relevant items per user but only {} items",
                self.relevant_per_user, self.num_items
            )));
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(LshError::config("noise must be a finite, non-negative number"));
        }
        Ok(())
    }
}

fn rows_to_corpus(matrix: &Array2<f32>) -> Result<Corpus> {
    let mut corpus = Corpus::new();
    for (i, row) in matrix.rows().into_iter().enumerate() {
        corpus.insert(i as u64, Vector::new(row.to_vec()))?;
    }
    Ok(corpus)
}

/// Generate a dataset. The same config always yields the same dataset.
pub fn generate(config: &SyntheticConfig) -> Result<Dataset> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let shape_users = (config.num_users, config.dimension);
    let shape_items = (config.num_items, config.dimension);

    let user_latent: Array2<f32> = Array2::random_using(shape_users, StandardNormal, &mut rng);
    let mut item_latent: Array2<f32> = Array2::random_using(shape_items, StandardNormal, &mut rng);
    for mut row in item_latent.rows_mut() {
        let scale: f32 = rng.gen_range(0.5..2.0);
        row *= scale;
    }

    let user_noise: Array2<f32> = Array2::random_using(shape_users, StandardNormal, &mut rng);
    let item_noise: Array2<f32> = Array2::random_using(shape_items, StandardNormal, &mut rng);
    let users = &user_latent + &(user_noise * config.noise);
    let items = &item_latent + &(item_noise * config.noise);

    let relevant = config.relevant_per_user;
    let ground_truth: GroundTruth = (0..config.num_users)
        .into_par_iter()
        .map(|u| {
            let user = user_latent.row(u);
            let scores: Vec<f32> = item_latent
                .rows()
                .into_iter()
                .map(|item| item.iter().zip(user.iter()).map(|(a, b)| a * b).sum())
                .collect();
            let mut order: Vec<usize> = (0..scores.len()).collect();
            order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
            order.truncate(relevant);
            (u as UserId, order.into_iter().map(|i| i as ItemId).collect())
        })
        .collect::<Vec<(UserId, Vec<ItemId>)>>()
        .into_iter()
        .collect();

    let dataset = Dataset {
        items: rows_to_corpus(&items)?,
        users: rows_to_corpus(&users)?,
        ground_truth,
    };
    info!(
        users = config.num_users,
        items = config.num_items,
        dimension = config.dimension,
        seed = config.seed,
        "generated synthetic dataset"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SyntheticConfig {
        SyntheticConfig {
            num_users: 5,
            num_items: 50,
            dimension: 4,
            relevant_per_user: 3,
            noise: 0.0,
            seed: 7,
        }
    }

    #[test]
    fn test_shapes() {
        let dataset = generate(&small()).unwrap();
        assert_eq!(dataset.items.len(), 50);
        assert_eq!(dataset.users.len(), 5);
        assert_eq!(dataset.items.dimension(), Some(4));
        assert_eq!(dataset.ground_truth.len(), 5);
        assert!(dataset.ground_truth.iter().all(|(_, items)| items.len() == 3));
    }

    #[test]
    fn test_reproducible() {
        let a = generate(&small()).unwrap();
        let b = generate(&small()).unwrap();
        assert_eq!(a.items.get(10), b.items.get(10));
        assert_eq!(a.users.get(3), b.users.get(3));
        assert_eq!(a.ground_truth.get(2), b.ground_truth.get(2));
    }

    #[test]
    fn test_noise_free_truth_is_exact_top_k() {
        let dataset = generate(&small()).unwrap();
        let user = dataset.users.get(0).unwrap();
        let mut scored: Vec<(u64, f32)> = dataset
            .items
            .iter()
            .map(|(id, item)| (id, user.dot(item).unwrap()))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let top: std::collections::HashSet<u64> = scored.iter().take(3).map(|p| p.0).collect();
        assert_eq!(dataset.ground_truth.get(0), Some(&top));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = small();
        config.relevant_per_user = 51;
        assert!(matches!(
            generate(&config),
            Err(LshError::InvalidConfig { .. })
        ));
        let mut config = small();
        config.noise = -1.0;
        assert!(config.validate().is_err());
    }
}
