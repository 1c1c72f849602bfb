//! JSON embedding files.
//!
//! ```json
//! {
//!   "items": { "1": [0.1, 0.2], "2": [0.3, -0.1] },
//!   "users": { "7": [1.0, 0.5] },
//!   "ground_truth": { "7": [2] }
//! }
//! ```
//!
//! `users` and `ground_truth` are optional.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::Dataset;
use crate::corpus::{Corpus, ItemId, UserId};
use crate::error::{LshError, Result};
use crate::vector::Vector;

/// On-disk layout of an embedding file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingFile {
    pub items: BTreeMap<ItemId, Vec<f32>>,
    #[serde(default)]
    pub users: BTreeMap<UserId, Vec<f32>>,
    #[serde(default)]
    pub ground_truth: BTreeMap<UserId, Vec<ItemId>>,
}

impl EmbeddingFile {
    pub fn into_dataset(self) -> Result<Dataset> {
        let dataset = Dataset {
            items: Corpus::from_vectors(self.items)?,
            users: Corpus::from_vectors(self.users)?,
            ground_truth: self.ground_truth.into_iter().collect(),
        };
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        let vectors = |corpus: &Corpus| {
            corpus
                .iter()
                .map(|(id, v)| (id, v.as_slice().to_vec()))
                .collect::<BTreeMap<_, _>>()
        };
        let ground_truth = dataset
            .ground_truth
            .iter()
            .map(|(user, items)| {
                let mut items: Vec<ItemId> = items.iter().copied().collect();
                items.sort_unstable();
                (user, items)
            })
            .collect();

        Self {
            items: vectors(&dataset.items),
            users: vectors(&dataset.users),
            ground_truth,
        }
    }
}

/// Read a dataset from a JSON embedding file.
pub fn load(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file: EmbeddingFile =
        serde_json::from_slice(&bytes).map_err(|e| LshError::SerializationError(e.to_string()))?;
    let dataset = file.into_dataset()?;
    info!(
        path = %path.display(),
        items = dataset.items.len(),
        users = dataset.users.len(),
        "loaded embeddings"
    );
    Ok(dataset)
}

/// Write a dataset as a JSON embedding file.
pub fn save(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let bytes = serde_json::to_vec(&EmbeddingFile::from_dataset(dataset))
        .map_err(|e| LshError::SerializationError(e.to_string()))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Parse a user vector given on the command line.
pub fn parse_vector(text: &str) -> Result<Vector> {
    let vector = Vector::from_str(text)?;
    if !vector.is_finite() {
        return Err(LshError::InvalidVector {
            reason: "query vector has a non-finite component".to_string(),
        });
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic::{generate, SyntheticConfig};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"items": {{"1": [1.0, 0.0], "2": [0.0, 1.0]}},
                "users": {{"7": [0.5, 0.5]}},
                "ground_truth": {{"7": [2]}}}}"#
        )
        .unwrap();

        let dataset = load(file.path()).unwrap();
        assert_eq!(dataset.items.len(), 2);
        assert_eq!(dataset.users.len(), 1);
        assert!(dataset.ground_truth.get(7).unwrap().contains(&2));
    }

    #[test]
    fn test_load_items_only() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"items": {{"3": [1.0, 2.0, 3.0]}}}}"#).unwrap();
        let dataset = load(file.path()).unwrap();
        assert_eq!(dataset.items.dimension(), Some(3));
        assert!(dataset.users.is_empty());
    }

    #[test]
    fn test_load_rejects_ragged_items() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"items": {{"1": [1.0, 2.0], "2": [1.0]}}}}"#).unwrap();
        assert!(matches!(
            load(file.path()),
            Err(LshError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"items": [1, 2]}}"#).unwrap();
        assert!(matches!(
            load(file.path()),
            Err(LshError::SerializationError(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.json");
        let original = generate(&SyntheticConfig {
            num_users: 3,
            num_items: 20,
            dimension: 4,
            relevant_per_user: 2,
            ..SyntheticConfig::default()
        })
        .unwrap();

        save(&original, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.items.len(), 20);
        assert_eq!(loaded.items.get(5), original.items.get(5));
        assert_eq!(loaded.ground_truth.get(1), original.ground_truth.get(1));
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("1, 2").unwrap().as_slice(), &[1.0, 2.0]);
        assert!(parse_vector("1, NaN").is_err());
    }
}
