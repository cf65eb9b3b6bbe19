//! Learned reranker (optional extension)
//!
//! A logistic model over the same normalized retrieval features the
//! fusion ranker blends. Weights are trained offline and arrive as a
//! small JSON artifact loaded out of the hot path; this module never
//! trains anything. Plugs in behind the same [`Reranker`] contract as
//! the fusion ranker.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocragError, Result};
use crate::search::fusion::{
    Candidate, LEXICAL_TIE_VALUE, MinMaxNormalizer, Reranker, RerankerKind, ScoreNormalizer,
    VECTOR_TIE_VALUE, dedupe_candidates, sort_ranked,
};
use crate::search::lexical::LexicalIndex;

/// Serialized logistic-regression weights over
/// `[normalized vector score, normalized lexical score]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnedWeights {
    pub bias: f32,
    pub vector_weight: f32,
    pub lexical_weight: f32,
}

pub struct LearnedReranker {
    weights: LearnedWeights,
    normalizer: Box<dyn ScoreNormalizer>,
}

impl std::fmt::Debug for LearnedReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedReranker")
            .field("weights", &self.weights)
            .field("normalizer", &self.normalizer.name())
            .finish()
    }
}

impl LearnedReranker {
    pub fn new(weights: LearnedWeights) -> Self {
        Self {
            weights,
            normalizer: Box::new(MinMaxNormalizer),
        }
    }

    /// Load weights from a JSON artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocragError::MissingArtifact(format!(
                "learned reranker weights not found at {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        let weights: LearnedWeights = serde_json::from_str(&raw)?;
        Ok(Self::new(weights))
    }

    fn probability(&self, vector_norm: f32, lexical_norm: f32) -> f32 {
        let logit = self.weights.bias
            + self.weights.vector_weight * vector_norm
            + self.weights.lexical_weight * lexical_norm;
        1.0 / (1.0 + (-logit).exp())
    }
}

impl Reranker for LearnedReranker {
    fn rerank(
        &self,
        lexical: &LexicalIndex,
        query: &str,
        candidates: &[Candidate],
        k: usize,
    ) -> Result<Vec<Candidate>> {
        if k == 0 {
            return Err(DocragError::InvalidQuery(
                "k must be at least 1".to_string(),
            ));
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let lexical_scores = lexical.score(query)?;
        let pool = dedupe_candidates(candidates);

        let v_raw: Vec<f32> = pool
            .iter()
            .map(|c| c.vector_score.unwrap_or(0.0))
            .collect();
        let b_raw: Vec<f32> = pool
            .iter()
            .map(|c| lexical_scores.get(&c.chunk_id).copied().unwrap_or(0.0))
            .collect();

        let v_norm = self.normalizer.normalize(&v_raw, VECTOR_TIE_VALUE);
        let b_norm = self.normalizer.normalize(&b_raw, LEXICAL_TIE_VALUE);

        let mut ranked: Vec<Candidate> = pool
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                c.bm25_score = Some(b_raw[i]);
                c.final_score = Some(self.probability(v_norm[i], b_norm[i]));
                c
            })
            .collect();

        sort_ranked(&mut ranked);
        ranked.truncate(k);
        Ok(ranked)
    }

    fn kind(&self) -> RerankerKind {
        RerankerKind::Learned
    }
}
