//! Query entrypoint
//!
//! `QueryEngine` wires the chunk store, source catalog, vector index,
//! lexical index, embedder, reranker, and answer policy into one
//! synchronous request flow. The indexes are built offline and immutable
//! here; a query only reads.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::Embedder;
use crate::error::{DocragError, Result};
use crate::search::answer::{Answer, AnswerPolicy};
use crate::search::fusion::{Candidate, Reranker, RerankerKind};
use crate::search::lexical::LexicalIndex;
use crate::search::vector::VectorIndex;
use crate::storage::sqlite::{ChunkRecord, ChunkStore};
use crate::storage::sources::SourceCatalog;

/// Minimum candidate pool fetched from the vector index before
/// reranking, regardless of the requested k.
pub const CANDIDATE_POOL_SIZE: usize = 30;

/// Default result count when the caller does not pass k.
pub const DEFAULT_K: usize = 5;

/// Retrieval mode. Parsed strictly; an unsupported mode is rejected, not
/// guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Vector top-k returned unchanged, lexical index never touched.
    Baseline,
    /// Fused vector + lexical ranking.
    Hybrid,
}

impl FromStr for QueryMode {
    type Err = DocragError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "baseline" => Ok(Self::Baseline),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(DocragError::InvalidQuery(format!(
                "unsupported mode: {other} (expected baseline or hybrid)"
            ))),
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub k: usize,
    pub mode: QueryMode,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k: DEFAULT_K,
            mode: QueryMode::Hybrid,
        }
    }

    #[must_use]
    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A ranked chunk enriched with its stored text and citation.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    pub chunk_id: i64,
    pub text: String,
    pub title: String,
    pub page: i64,
    pub url: String,
    pub vector_score: Option<f32>,
    pub bm25_score: Option<f32>,
    pub final_score: Option<f32>,
}

impl ContextChunk {
    /// Fused score when present, else vector similarity.
    pub fn confidence(&self) -> f32 {
        self.final_score.or(self.vector_score).unwrap_or(0.0)
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: Option<Answer>,
    pub contexts: Vec<ContextChunk>,
    pub reranker_used: RerankerKind,
}

pub struct QueryEngine {
    store: ChunkStore,
    sources: SourceCatalog,
    vector: VectorIndex,
    /// Absent when the lexical index was never built; hybrid queries
    /// check this explicitly instead of degrading through empty scores.
    lexical: Option<LexicalIndex>,
    embedder: Box<dyn Embedder>,
    reranker: Box<dyn Reranker>,
    policy: AnswerPolicy,
    pool_size: usize,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("vectors", &self.vector.len())
            .field("lexical", &self.lexical.is_some())
            .field("pool_size", &self.pool_size)
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    pub fn new(
        store: ChunkStore,
        sources: SourceCatalog,
        vector: VectorIndex,
        lexical: Option<LexicalIndex>,
        embedder: Box<dyn Embedder>,
        reranker: Box<dyn Reranker>,
        policy: AnswerPolicy,
    ) -> Self {
        Self {
            store,
            sources,
            vector,
            lexical,
            embedder,
            reranker,
            policy,
            pool_size: CANDIDATE_POOL_SIZE,
        }
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Swap the reranking strategy (e.g. the learned variant).
    pub fn set_reranker(&mut self, reranker: Box<dyn Reranker>) {
        self.reranker = reranker;
    }

    /// Answer a query end to end.
    ///
    /// An empty corpus degrades to an empty context list and an abstained
    /// answer; only startup-level misconfiguration is an error here.
    pub fn ask(&self, request: &QueryRequest) -> Result<QueryResponse> {
        if request.k == 0 {
            return Err(DocragError::InvalidQuery(
                "k must be at least 1".to_string(),
            ));
        }

        // Always over-fetch so hybrid reranking has a real pool to work
        // with, even for small k.
        let pool = request.k.max(self.pool_size);
        let query_vector = self.embedder.embed(&request.query);
        let hits = self.vector.search(&query_vector, pool);
        debug!(query = %request.query, pool = hits.len(), mode = %request.mode, "vector candidates");

        let mut candidates = Vec::with_capacity(hits.len());
        let mut cached: HashMap<i64, ChunkRecord> = HashMap::with_capacity(hits.len());
        for (slot, similarity) in hits {
            match self.store.chunk_by_slot(slot as i64)? {
                Some(record) => {
                    candidates.push(Candidate::from_vector(record.id, similarity));
                    cached.insert(record.id, record);
                }
                None => {
                    warn!(slot, "vector slot has no chunk, skipping");
                }
            }
        }

        let (chosen, reranker_used) = match request.mode {
            QueryMode::Baseline => {
                let mut top = candidates;
                top.truncate(request.k);
                (top, RerankerKind::None)
            }
            QueryMode::Hybrid => {
                let lexical = self.lexical.as_ref().ok_or_else(|| {
                    DocragError::MissingArtifact(
                        "lexical index not built; hybrid mode unavailable".to_string(),
                    )
                })?;
                let ranked =
                    self.reranker
                        .rerank(lexical, &request.query, &candidates, request.k)?;
                (ranked, self.reranker.kind())
            }
        };

        let contexts: Vec<ContextChunk> = chosen
            .iter()
            .map(|c| self.enrich(c, &cached))
            .collect();
        let answer = self.policy.assemble(&contexts);

        Ok(QueryResponse {
            answer,
            contexts,
            reranker_used,
        })
    }

    /// Resolve a ranked candidate to its stored text and citation.
    ///
    /// A store miss falls back to the record cached during candidate
    /// collection; the request never fails over a single lost chunk.
    fn enrich(&self, candidate: &Candidate, cached: &HashMap<i64, ChunkRecord>) -> ContextChunk {
        let record = match self.store.get_chunk(candidate.chunk_id) {
            Ok(Some(record)) => Some(record),
            Ok(None) => None,
            Err(err) => {
                warn!(chunk_id = candidate.chunk_id, %err, "chunk lookup failed");
                None
            }
        };
        let record = record.or_else(|| cached.get(&candidate.chunk_id).cloned());

        match record {
            Some(record) => ContextChunk {
                chunk_id: candidate.chunk_id,
                url: self.sources.url_for(&record.source_id),
                text: record.text,
                title: record.title,
                page: record.page,
                vector_score: candidate.vector_score,
                bm25_score: candidate.bm25_score,
                final_score: candidate.final_score,
            },
            None => {
                warn!(chunk_id = candidate.chunk_id, "no stored or cached chunk data");
                ContextChunk {
                    chunk_id: candidate.chunk_id,
                    text: String::new(),
                    title: String::new(),
                    page: 0,
                    url: String::new(),
                    vector_score: candidate.vector_score,
                    bm25_score: candidate.bm25_score,
                    final_score: candidate.final_score,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::search::answer::DEFAULT_ABSTAIN_THRESHOLD;
    use crate::search::fusion::{DEFAULT_ALPHA, FusionRanker};
    use crate::storage::sources::Source;

    const DIMS: usize = 128;

    fn build_engine(texts: &[&str]) -> QueryEngine {
        let store = ChunkStore::open_in_memory().unwrap();
        let embedder = HashEmbedder::new(DIMS);
        let mut vector = VectorIndex::new(DIMS);

        let mut corpus = Vec::new();
        for text in texts {
            let id = store.insert_chunk("src-a", "Doc A", 1, text).unwrap();
            let slot = vector.add(embedder.embed(text)).unwrap();
            store.set_embedding_slot(id, slot as i64).unwrap();
            corpus.push((id, (*text).to_string()));
        }
        let lexical = LexicalIndex::build(&corpus).unwrap();

        let sources = SourceCatalog::from_sources(vec![Source {
            id: "src-a".to_string(),
            title: "Doc A".to_string(),
            url: "https://example.com/a".to_string(),
        }]);

        QueryEngine::new(
            store,
            sources,
            vector,
            Some(lexical),
            Box::new(HashEmbedder::new(DIMS)),
            Box::new(FusionRanker::new(DEFAULT_ALPHA).unwrap()),
            AnswerPolicy::new(DEFAULT_ABSTAIN_THRESHOLD),
        )
    }

    #[test]
    fn test_mode_parses_strictly() {
        assert_eq!("baseline".parse::<QueryMode>().unwrap(), QueryMode::Baseline);
        assert_eq!("Hybrid".parse::<QueryMode>().unwrap(), QueryMode::Hybrid);
        assert!(matches!(
            "fancy".parse::<QueryMode>(),
            Err(DocragError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_k_zero_rejected_at_boundary() {
        let engine = build_engine(&["some chunk text"]);
        let err = engine
            .ask(&QueryRequest::new("query").k(0))
            .unwrap_err();
        assert!(matches!(err, DocragError::InvalidQuery(_)));
    }

    #[test]
    fn test_hybrid_query_returns_citation() {
        let engine = build_engine(&[
            "beehives need winter insulation to survive frost",
            "chicken coops should face south for morning light",
            "rain barrels store roof runoff for dry spells",
        ]);

        let response = engine
            .ask(&QueryRequest::new("beehives frost insulation").k(2))
            .unwrap();

        assert_eq!(response.reranker_used, RerankerKind::Hybrid);
        assert!(!response.contexts.is_empty());
        assert!(response.contexts.len() <= 2);
        let top = &response.contexts[0];
        assert!(top.text.contains("beehives"));
        assert_eq!(top.url, "https://example.com/a");
        assert!(top.final_score.is_some());
        assert!(top.bm25_score.is_some());
    }

    #[test]
    fn test_baseline_mode_bypasses_reranker() {
        let engine = build_engine(&[
            "beehives need winter insulation to survive frost",
            "chicken coops should face south for morning light",
        ]);

        let response = engine
            .ask(&QueryRequest::new("beehives").mode(QueryMode::Baseline).k(2))
            .unwrap();

        assert_eq!(response.reranker_used, RerankerKind::None);
        for ctx in &response.contexts {
            // Vector order untouched: no fused or lexical score attached.
            assert!(ctx.final_score.is_none());
            assert!(ctx.bm25_score.is_none());
            assert!(ctx.vector_score.is_some());
        }
        // Baseline order follows vector similarity descending.
        let scores: Vec<f32> = response
            .contexts
            .iter()
            .map(|c| c.vector_score.unwrap())
            .collect();
        for window in scores.windows(2) {
            assert!(window[0] >= window[1]);
        }
    }

    #[test]
    fn test_baseline_without_lexical_index_works() {
        let store = ChunkStore::open_in_memory().unwrap();
        let embedder = HashEmbedder::new(DIMS);
        let mut vector = VectorIndex::new(DIMS);
        let id = store.insert_chunk("src-a", "Doc A", 1, "lone chunk").unwrap();
        let slot = vector.add(embedder.embed("lone chunk")).unwrap();
        store.set_embedding_slot(id, slot as i64).unwrap();

        let engine = QueryEngine::new(
            store,
            SourceCatalog::default(),
            vector,
            None,
            Box::new(HashEmbedder::new(DIMS)),
            Box::new(FusionRanker::new(DEFAULT_ALPHA).unwrap()),
            AnswerPolicy::default(),
        );

        let baseline = engine
            .ask(&QueryRequest::new("chunk").mode(QueryMode::Baseline))
            .unwrap();
        assert_eq!(baseline.contexts.len(), 1);

        // Hybrid mode without the lexical index is an explicit error,
        // not a silent zero-score degradation.
        let err = engine.ask(&QueryRequest::new("chunk")).unwrap_err();
        assert!(matches!(err, DocragError::MissingArtifact(_)));
    }

    #[test]
    fn test_empty_corpus_degrades_to_abstention() {
        let engine = build_engine(&[]);
        let response = engine.ask(&QueryRequest::new("anything")).unwrap();
        assert!(response.contexts.is_empty());
        assert!(response.answer.is_none());
    }

    #[test]
    fn test_k_bounds_response() {
        let texts: Vec<String> = (0..40)
            .map(|i| format!("chunk number {i} about gardening topic {i}"))
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let engine = build_engine(&refs);

        let response = engine
            .ask(&QueryRequest::new("gardening").k(5))
            .unwrap();
        assert_eq!(response.contexts.len(), 5);

        let mut seen = std::collections::HashSet::new();
        for ctx in &response.contexts {
            assert!(seen.insert(ctx.chunk_id));
        }
    }

    #[test]
    fn test_determinism_across_calls() {
        let engine = build_engine(&[
            "solar panels on the barn roof",
            "wind turbine maintenance schedule",
            "battery bank sizing for off grid cabins",
        ]);
        let request = QueryRequest::new("off grid solar battery").k(3);

        let a = engine.ask(&request).unwrap();
        let b = engine.ask(&request).unwrap();
        let ids_a: Vec<i64> = a.contexts.iter().map(|c| c.chunk_id).collect();
        let ids_b: Vec<i64> = b.contexts.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_request_builder_defaults() {
        let request = QueryRequest::new("q");
        assert_eq!(request.k, DEFAULT_K);
        assert_eq!(request.mode, QueryMode::Hybrid);
    }
}
