//! Embedding backends
//!
//! The engine never computes "real" (model-based) embeddings itself; it
//! consumes vectors from an `Embedder` collaborator. The built-in FNV-1a
//! hash backend is fully deterministic and dependency-free, which keeps
//! offline corpus builds and tests reproducible. A model-backed backend
//! plugs in behind the same trait.
//!
//! Contract for every backend: fixed output dimensionality, L2-normalized
//! output, and identical vectors for identical input within one build or
//! query session.

use crate::config::SearchConfig;
use crate::error::{DocragError, Result};

/// Pluggable embedding backend interface.
pub trait Embedder {
    /// Embed text into an L2-normalized fixed-length vector.
    fn embed(&self, text: &str) -> Vec<f32>;
    fn dims(&self) -> usize;
}

/// Build an embedder from search config.
pub fn build_embedder(config: &SearchConfig) -> Result<Box<dyn Embedder>> {
    let backend = config.embedding_backend.trim().to_lowercase();
    let dims = config.embedding_dims as usize;
    if dims == 0 {
        return Err(DocragError::Config(
            "search.embedding_dims must be greater than 0".to_string(),
        ));
    }

    match backend.as_str() {
        "" | "hash" => Ok(Box::new(HashEmbedder::new(dims))),
        "external" => Err(DocragError::Config(
            "search.embedding_backend=external requires an external embedding service; \
             none is configured"
                .to_string(),
        )),
        other => Err(DocragError::Config(format!(
            "unknown embedding backend: {other}"
        ))),
    }
}

/// Deterministic hash embedder using FNV-1a.
///
/// Accumulates signed hash contributions for unigrams and (half-weighted)
/// bigrams, then L2-normalizes. Not a semantic model, but it preserves
/// lexical overlap well enough for hermetic retrieval tests and offline
/// corpus builds.
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dims(&self) -> usize {
        self.dim
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        if self.dim == 0 {
            return Vec::new();
        }

        let tokens = tokenize(text);
        let mut embedding = vec![0.0; self.dim];

        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            accumulate_embedding(&mut embedding, token, 1.0);
        }

        for window in tokens.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            accumulate_embedding(&mut embedding, &bigram, 0.5);
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        HashEmbedder::embed(self, text)
    }

    fn dims(&self) -> usize {
        self.dim
    }
}

/// Lower-cased maximal alphanumeric runs, the same rule the lexical
/// channel uses, so both retrieval signals see one token space.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn accumulate_embedding(embedding: &mut [f32], token: &str, weight: f32) {
    let token_hash = fnv1a_hash(token.as_bytes());

    for i in 0..embedding.len() {
        let dim_hash = fnv1a_hash_with_salt(token_hash, i as u64);
        let sign = if dim_hash & 1 == 0 { weight } else { -weight };
        let dim = ((dim_hash >> 1) as usize) % embedding.len();
        embedding[dim] += sign;
    }
}

fn fnv1a_hash_with_salt(seed: u64, salt: u64) -> u64 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..].copy_from_slice(&salt.to_le_bytes());
    fnv1a_hash(&bytes)
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}
