//! Hybrid retrieval over the chunk corpus
//!
//! Implements hybrid search: BM25 full-text + hash embeddings + min-max
//! score fusion, topped by an extractive answer policy.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           Query                                │
//! └────────────────────────────────────────────────────────────────┘
//!                     │                          │
//!                     ▼                          ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────────┐
//! │       LexicalIndex           │  │       VectorIndex            │
//! │   (Tantivy BM25 search)      │  │   (Hash embeddings)          │
//! └──────────────────────────────┘  └──────────────────────────────┘
//!                     │                          │
//!                     └──────────┬───────────────┘
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │  Min-max fusion (fusion.rs)   │
//!                │  or logistic model (learned)  │
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │  Answer policy (answer.rs)    │
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!                     Answer or abstention + contexts
//! ```

pub mod answer;
pub mod engine;
pub mod fusion;
pub mod learned;
pub mod lexical;
pub mod vector;

// Re-export main types
pub use answer::{Answer, AnswerPolicy, DEFAULT_ABSTAIN_THRESHOLD};
pub use engine::{
    CANDIDATE_POOL_SIZE, ContextChunk, DEFAULT_K, QueryEngine, QueryMode, QueryRequest,
    QueryResponse,
};
pub use fusion::{
    Candidate, DEFAULT_ALPHA, FusionRanker, MinMaxNormalizer, Reranker, RerankerKind,
    ScoreNormalizer, ZScoreNormalizer, normalizer_from_name,
};
pub use learned::{LearnedReranker, LearnedWeights};
pub use lexical::LexicalIndex;
pub use vector::VectorIndex;
