//! Application assembly
//!
//! Loads the corpus artifacts named by config and composes them into a
//! ready [`QueryEngine`]. All artifact validation happens here, up front:
//! a missing or inconsistent corpus refuses to serve at all instead of
//! answering queries badly later.

use tracing::info;

use crate::config::Config;
use crate::embedding::{Embedder, build_embedder};
use crate::error::{DocragError, Result};
use crate::search::answer::AnswerPolicy;
use crate::search::engine::QueryEngine;
use crate::search::fusion::{FusionRanker, normalizer_from_name};
use crate::search::learned::LearnedReranker;
use crate::search::lexical::LexicalIndex;
use crate::search::vector::VectorIndex;
use crate::storage::sqlite::ChunkStore;
use crate::storage::sources::SourceCatalog;

pub struct AppContext {
    pub config: Config,
    pub engine: QueryEngine,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Load all artifacts and build the engine, refusing to start on a
    /// missing or inconsistent corpus.
    pub fn load(config: Config) -> Result<Self> {
        Self::load_with(config, None)
    }

    /// Like [`Self::load`], with optional overrides from the command
    /// line: a fusion alpha and a learned-weights artifact path.
    pub fn load_with(config: Config, overrides: Option<EngineOverrides>) -> Result<Self> {
        let overrides = overrides.unwrap_or_default();

        let store = ChunkStore::open_existing(config.db_path())?;
        let vector = VectorIndex::load(config.vector_index_path())?;
        let sources = SourceCatalog::load(config.sources_path())?;

        // The vector index addresses chunks purely by position, so any
        // count drift means the id spaces no longer line up.
        let chunk_count = store.count()?;
        if vector.len() as u64 != chunk_count {
            return Err(DocragError::Config(format!(
                "vector index holds {} vectors but the chunk store holds {} chunks; \
                 rebuild with `docrag index`",
                vector.len(),
                chunk_count
            )));
        }

        // The lexical index is rebuilt in RAM from the chunk table at
        // startup, so it can never drift from the system of record.
        let corpus: Vec<(i64, String)> = store
            .all_chunks()?
            .into_iter()
            .map(|c| (c.id, c.text))
            .collect();
        let lexical = LexicalIndex::build(&corpus)?;

        let embedder = build_embedder(&config.search)?;
        if embedder.dims() != vector.dims() {
            return Err(DocragError::Config(format!(
                "configured embedder produces {} dims but the vector index was built \
                 with {}; rebuild with `docrag index`",
                embedder.dims(),
                vector.dims()
            )));
        }

        let alpha = overrides.alpha.unwrap_or(config.search.alpha);
        let reranker: Box<dyn crate::search::fusion::Reranker> =
            match &overrides.learned_weights {
                Some(path) => Box::new(LearnedReranker::load(path)?),
                None => {
                    let normalizer = normalizer_from_name(&config.search.normalizer)?;
                    Box::new(FusionRanker::with_normalizer(alpha, normalizer)?)
                }
            };

        info!(
            chunks = chunk_count,
            sources = sources.len(),
            dims = vector.dims(),
            alpha,
            "corpus loaded"
        );

        let policy = AnswerPolicy::new(config.search.abstain_threshold);
        let engine = QueryEngine::new(
            store,
            sources,
            vector,
            Some(lexical),
            embedder,
            reranker,
            policy,
        )
        .pool_size(config.search.pool_size);

        Ok(Self { config, engine })
    }
}

/// Command-line adjustments applied on top of config at load time.
#[derive(Debug, Clone, Default)]
pub struct EngineOverrides {
    pub alpha: Option<f32>,
    pub learned_weights: Option<std::path::PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::search::engine::QueryRequest;

    fn seeded_config(dir: &std::path::Path, texts: &[&str]) -> Config {
        let config = Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        };

        let store = ChunkStore::open(config.db_path()).unwrap();
        let embedder = HashEmbedder::new(config.search.embedding_dims as usize);
        let mut vector = VectorIndex::new(embedder.dims());
        for text in texts {
            let id = store.insert_chunk("src", "Doc", 1, text).unwrap();
            let slot = vector.add(embedder.embed(text)).unwrap();
            store.set_embedding_slot(id, slot as i64).unwrap();
        }
        vector.save(config.vector_index_path()).unwrap();
        std::fs::write(
            config.sources_path(),
            r#"[{"id": "src", "title": "Doc", "url": "https://example.com"}]"#,
        )
        .unwrap();

        config
    }

    #[test]
    fn test_load_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path(), &["wood stoves heat small cabins efficiently"]);

        let app = AppContext::load(config).unwrap();
        let response = app.engine.ask(&QueryRequest::new("wood stove heat")).unwrap();
        assert_eq!(response.contexts.len(), 1);
    }

    #[test]
    fn test_refuses_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let err = AppContext::load(config).unwrap_err();
        assert!(matches!(err, DocragError::MissingArtifact(_)));
    }

    #[test]
    fn test_refuses_missing_vector_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path(), &["some text"]);
        std::fs::remove_file(config.vector_index_path()).unwrap();

        let err = AppContext::load(config).unwrap_err();
        assert!(matches!(err, DocragError::MissingArtifact(_)));
    }

    #[test]
    fn test_refuses_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path(), &["some text"]);
        std::fs::remove_file(config.sources_path()).unwrap();

        let err = AppContext::load(config).unwrap_err();
        assert!(matches!(err, DocragError::MissingArtifact(_)));
    }

    #[test]
    fn test_refuses_count_drift() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path(), &["first chunk", "second chunk"]);

        // Extra chunk ingested after the index build
        let store = ChunkStore::open(config.db_path()).unwrap();
        store.insert_chunk("src", "Doc", 2, "unindexed chunk").unwrap();
        drop(store);

        let err = AppContext::load(config).unwrap_err();
        assert!(matches!(err, DocragError::Config(_)));
    }

    #[test]
    fn test_alpha_override_validated() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path(), &["some text"]);

        let overrides = EngineOverrides {
            alpha: Some(2.0),
            learned_weights: None,
        };
        let err = AppContext::load_with(config, Some(overrides)).unwrap_err();
        assert!(matches!(err, DocragError::InvalidQuery(_)));
    }

    #[test]
    fn test_learned_weights_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path(), &["logistic model reranking"]);
        let weights_path = dir.path().join("weights.json");
        std::fs::write(
            &weights_path,
            r#"{"bias": 0.0, "vector_weight": 1.0, "lexical_weight": 1.0}"#,
        )
        .unwrap();

        let overrides = EngineOverrides {
            alpha: None,
            learned_weights: Some(weights_path),
        };
        let app = AppContext::load_with(config, Some(overrides)).unwrap();
        let response = app.engine.ask(&QueryRequest::new("logistic model")).unwrap();
        assert_eq!(
            response.reranker_used,
            crate::search::fusion::RerankerKind::Learned
        );
    }
}
