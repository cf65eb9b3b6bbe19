//! Dense vector index
//!
//! Flat inner-product index over pre-normalized chunk embeddings
//! (equivalent to cosine similarity since the embedder L2-normalizes).
//! The index exclusively owns the embedding matrix and knows only
//! positional slots; slot-to-chunk resolution belongs to the chunk store.
//!
//! Built once offline, immutable afterwards, safe to share across
//! concurrent readers.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocragError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    dims: usize,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            vectors: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append an embedding and return its slot.
    pub fn add(&mut self, embedding: Vec<f32>) -> Result<usize> {
        if embedding.len() != self.dims {
            return Err(DocragError::Embedding(format!(
                "embedding has {} dims, index expects {}",
                embedding.len(),
                self.dims
            )));
        }
        self.vectors.push(embedding);
        Ok(self.vectors.len() - 1)
    }

    /// Top-k slots by inner product, descending.
    ///
    /// Returns at most k `(slot, similarity)` pairs; ties break by
    /// ascending slot for determinism. An empty index or a query of the
    /// wrong dimensionality yields an empty result, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.vectors.is_empty() || query.len() != self.dims || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, v)| (slot, dot_product(query, v)))
            .collect();

        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);
        scored
    }

    /// Write the index artifact (the persisted vector-index file).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Load the index artifact; a missing file is a configuration failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocragError::MissingArtifact(format!(
                "vector index not found at {}; run `docrag index` first",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: &[f32]) -> Vec<f32> {
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / norm).collect()
    }

    #[test]
    fn test_add_returns_slots_in_order() {
        let mut index = VectorIndex::new(2);
        assert_eq!(index.add(vec![1.0, 0.0]).unwrap(), 0);
        assert_eq!(index.add(vec![0.0, 1.0]).unwrap(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_dims_mismatch_rejected_on_add() {
        let mut index = VectorIndex::new(3);
        let err = index.add(vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, DocragError::Embedding(_)));
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let mut index = VectorIndex::new(2);
        index.add(unit(&[1.0, 0.0])).unwrap();
        index.add(unit(&[0.0, 1.0])).unwrap();
        index.add(unit(&[1.0, 1.0])).unwrap();

        let hits = index.search(&unit(&[1.0, 0.0]), 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 2);
        assert_eq!(hits[2].0, 1);
        assert!(hits[0].1 > hits[1].1 && hits[1].1 > hits[2].1);
    }

    #[test]
    fn test_search_bounds_k() {
        let mut index = VectorIndex::new(2);
        for _ in 0..10 {
            index.add(unit(&[1.0, 2.0])).unwrap();
        }
        assert_eq!(index.search(&unit(&[1.0, 0.0]), 3).len(), 3);
        assert_eq!(index.search(&unit(&[1.0, 0.0]), 100).len(), 10);
    }

    #[test]
    fn test_tied_scores_break_by_slot() {
        let mut index = VectorIndex::new(2);
        index.add(vec![1.0, 0.0]).unwrap();
        index.add(vec![1.0, 0.0]).unwrap();
        index.add(vec![1.0, 0.0]).unwrap();

        let hits = index.search(&[1.0, 0.0], 3);
        let slots: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = VectorIndex::new(4);
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_query_dims_mismatch_returns_empty() {
        let mut index = VectorIndex::new(2);
        index.add(vec![1.0, 0.0]).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");

        let mut index = VectorIndex::new(2);
        index.add(unit(&[3.0, 4.0])).unwrap();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.dims(), 2);
        assert_eq!(loaded.len(), 1);
        let hits = loaded.search(&unit(&[3.0, 4.0]), 1);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::load(dir.path().join("vectors.json")).unwrap_err();
        assert!(matches!(err, DocragError::MissingArtifact(_)));
    }
}
