//! Hybrid score fusion
//!
//! Blends vector similarity and BM25 relevance for a candidate pool into
//! one ranked list:
//!
//! ```text
//! final = alpha * norm(vector) + (1 - alpha) * norm(bm25)
//! ```
//!
//! Both channels are min-max normalized across the candidate set, with
//! asymmetric degenerate handling: an all-tied vector channel normalizes
//! to 1.0 (a uniformly confident pool keeps its confidence), while an
//! all-tied lexical channel normalizes to 0.0 (a channel with no signal,
//! e.g. a stop-word-only query, must not look confident). That asymmetry
//! is a contract, pinned by tests; do not unify the two policies without
//! re-validating retrieval quality.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::{DocragError, Result};
use crate::search::lexical::LexicalIndex;

/// Default blend weight for the vector channel.
pub const DEFAULT_ALPHA: f32 = 0.6;

/// Normalized value a degenerate (all-tied) vector channel collapses to.
pub const VECTOR_TIE_VALUE: f32 = 1.0;

/// Normalized value a degenerate (all-tied) lexical channel collapses to.
pub const LEXICAL_TIE_VALUE: f32 = 0.0;

/// Spread below which a channel counts as degenerate.
const SPREAD_EPSILON: f32 = 1e-9;

/// Ephemeral ranking record flowing through the retrieval stages.
///
/// After any retrieval stage has run, at least one of
/// `vector_score`/`bm25_score` is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub chunk_id: i64,
    /// Inner-product similarity from the vector index.
    pub vector_score: Option<f32>,
    /// Raw BM25 score from the lexical index.
    pub bm25_score: Option<f32>,
    /// Fused score, populated by a reranker.
    pub final_score: Option<f32>,
}

impl Candidate {
    /// Candidate seeded from a vector-index hit.
    pub fn from_vector(chunk_id: i64, vector_score: f32) -> Self {
        Self {
            chunk_id,
            vector_score: Some(vector_score),
            bm25_score: None,
            final_score: None,
        }
    }

    /// Ranking confidence: fused score when present (hybrid mode), else
    /// the vector similarity (baseline mode).
    pub fn confidence(&self) -> f32 {
        self.final_score.or(self.vector_score).unwrap_or(0.0)
    }
}

/// Which reranking strategy produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankerKind {
    /// Baseline mode: vector order returned unchanged.
    None,
    Hybrid,
    Learned,
}

/// Normalization strategy for one score channel across a candidate set.
///
/// `tie_value` is the value every entry collapses to when the channel is
/// degenerate (max equals min, including the singleton pool).
pub trait ScoreNormalizer: Send + Sync {
    fn normalize(&self, raw: &[f32], tie_value: f32) -> Vec<f32>;
    fn name(&self) -> &'static str;
}

/// Min-max scaling to [0, 1]. The shipped default.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinMaxNormalizer;

impl ScoreNormalizer for MinMaxNormalizer {
    fn normalize(&self, raw: &[f32], tie_value: f32) -> Vec<f32> {
        if raw.is_empty() {
            return Vec::new();
        }
        let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
        let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if max - min > SPREAD_EPSILON {
            raw.iter().map(|x| (x - min) / (max - min)).collect()
        } else {
            vec![tie_value; raw.len()]
        }
    }

    fn name(&self) -> &'static str {
        "minmax"
    }
}

/// Z-score standardization squashed through a logistic so the output
/// stays inside [0, 1] like every other strategy. Zero spread collapses
/// to the channel's tie value, same as min-max.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZScoreNormalizer;

impl ScoreNormalizer for ZScoreNormalizer {
    fn normalize(&self, raw: &[f32], tie_value: f32) -> Vec<f32> {
        if raw.is_empty() {
            return Vec::new();
        }
        let n = raw.len() as f32;
        let mean = raw.iter().sum::<f32>() / n;
        let var = raw.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / n;
        let std = var.sqrt();
        if std > SPREAD_EPSILON {
            raw.iter()
                .map(|x| {
                    let z = (x - mean) / std;
                    1.0 / (1.0 + (-z).exp())
                })
                .collect()
        } else {
            vec![tie_value; raw.len()]
        }
    }

    fn name(&self) -> &'static str {
        "zscore"
    }
}

/// Look up a normalizer strategy by config name.
pub fn normalizer_from_name(name: &str) -> Result<Box<dyn ScoreNormalizer>> {
    match name.trim().to_lowercase().as_str() {
        "" | "minmax" => Ok(Box::new(MinMaxNormalizer)),
        "zscore" => Ok(Box::new(ZScoreNormalizer)),
        other => Err(DocragError::Config(format!(
            "unknown score normalizer: {other}"
        ))),
    }
}

/// A reranking strategy: same contract for the hybrid fusion ranker and
/// the optional learned variant.
pub trait Reranker: Send + Sync {
    fn rerank(
        &self,
        lexical: &LexicalIndex,
        query: &str,
        candidates: &[Candidate],
        k: usize,
    ) -> Result<Vec<Candidate>>;

    fn kind(&self) -> RerankerKind;
}

/// Fusion ranker blending normalized vector and lexical scores.
pub struct FusionRanker {
    alpha: f32,
    normalizer: Box<dyn ScoreNormalizer>,
}

impl std::fmt::Debug for FusionRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionRanker")
            .field("alpha", &self.alpha)
            .field("normalizer", &self.normalizer.name())
            .finish()
    }
}

impl FusionRanker {
    /// Ranker with the default min-max normalizer.
    pub fn new(alpha: f32) -> Result<Self> {
        Self::with_normalizer(alpha, Box::new(MinMaxNormalizer))
    }

    pub fn with_normalizer(alpha: f32, normalizer: Box<dyn ScoreNormalizer>) -> Result<Self> {
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return Err(DocragError::InvalidQuery(format!(
                "alpha must be in [0, 1], got {alpha}"
            )));
        }
        Ok(Self { alpha, normalizer })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Blend pre-fetched lexical scores into the candidate pool.
    ///
    /// Exposed separately from [`Reranker::rerank`] so property tests and
    /// the learned reranker can exercise the fusion arithmetic without a
    /// lexical index. Candidates absent from `lexical_scores` score 0 on
    /// the lexical channel.
    pub fn rerank_with_scores(
        &self,
        candidates: &[Candidate],
        lexical_scores: &HashMap<i64, f32>,
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
                c.final_score = Some(self.alpha * v_norm[i] + (1.0 - self.alpha) * b_norm[i]);
                c
            })
            .collect();

        sort_ranked(&mut ranked);
        ranked.truncate(k);
        Ok(ranked)
    }
}

impl Reranker for FusionRanker {
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
        // One lexical query for the whole pool, then subset selection.
        let lexical_scores = lexical.score(query)?;
        self.rerank_with_scores(candidates, &lexical_scores, k)
    }

    fn kind(&self) -> RerankerKind {
        RerankerKind::Hybrid
    }
}

/// Collapse duplicate chunk ids: first-occurrence order is kept, the last
/// occurrence's scores win.
pub(crate) fn dedupe_candidates(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut order: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut position: HashMap<i64, usize> = HashMap::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(&i) = position.get(&candidate.chunk_id) {
            order[i] = candidate.clone();
        } else {
            position.insert(candidate.chunk_id, order.len());
            order.push(candidate.clone());
        }
    }
    order
}

/// Deterministic ranking order: fused score descending, then original
/// vector score descending, then chunk id ascending.
pub(crate) fn sort_ranked(ranked: &mut [Candidate]) {
    ranked.sort_by(|a, b| {
        match b
            .final_score
            .unwrap_or(0.0)
            .total_cmp(&a.final_score.unwrap_or(0.0))
        {
            Ordering::Equal => {}
            other => return other,
        }
        match b
            .vector_score
            .unwrap_or(0.0)
            .total_cmp(&a.vector_score.unwrap_or(0.0))
        {
            Ordering::Equal => {}
            other => return other,
        }
        a.chunk_id.cmp(&b.chunk_id)
    });
}
