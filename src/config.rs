//! Configuration loading
//!
//! Config is read from an explicit `--config` path, else from
//! `~/.config/docrag/config.toml` if present, with env var overrides
//! applied last. Every field has a serde default so a partial (or absent)
//! file is always valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocragError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the corpus artifacts (chunk DB, vector index,
    /// source catalog).
    pub data_dir: PathBuf,
    pub search: SearchConfig,
    pub chunking: ChunkingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            search: SearchConfig::default(),
            chunking: ChunkingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Embedding backend: "hash" (built-in, deterministic) or "external".
    pub embedding_backend: String,
    pub embedding_dims: u32,
    /// Blend weight for the vector channel in hybrid fusion.
    pub alpha: f32,
    /// Confidence floor below which the assembler abstains.
    pub abstain_threshold: f32,
    /// Default number of results when the caller does not pass k.
    pub default_k: usize,
    /// Minimum candidate pool fetched from the vector index before
    /// reranking, regardless of the requested k.
    pub pool_size: usize,
    /// Score normalization strategy: "minmax" or "zscore".
    pub normalizer: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embedding_backend: "hash".to_string(),
            embedding_dims: 384,
            alpha: 0.6,
            abstain_threshold: 0.15,
            default_k: 5,
            pool_size: 30,
            normalizer: "minmax".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size: pages longer than this are split into consecutive
    /// windows of exactly this many words.
    pub max_words: usize,
    /// Documented lower bound for chunk sizing. Short trailing windows
    /// are retained as-is, so this is informational, not enforced.
    pub min_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: 350,
            min_words: 80,
        }
    }
}

impl Config {
    /// Load config from an explicit path, or the global config file, with
    /// env overrides applied last.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("DOCRAG_CONFIG").ok().map(PathBuf::from));

        let mut config = if let Some(path) = explicit {
            Self::load_file(&path)?
        } else if let Some(global) = Self::global_path() {
            if global.exists() {
                Self::load_file(&global)?
            } else {
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("docrag/config.toml"))
    }

    fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| DocragError::Config(format!("read config {}: {err}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|err| DocragError::Config(format!("parse config {}: {err}", path.display())))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("DOCRAG_DATA_DIR") {
            if !dir.is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
    }

    /// Path of the SQLite chunk table.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("chunks.db")
    }

    /// Path of the serialized vector index.
    pub fn vector_index_path(&self) -> PathBuf {
        self.data_dir.join("vectors.json")
    }

    /// Path of the source catalog.
    pub fn sources_path(&self) -> PathBuf {
        self.data_dir.join("sources.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.embedding_backend, "hash");
        assert_eq!(config.search.embedding_dims, 384);
        assert!((config.search.alpha - 0.6).abs() < f32::EPSILON);
        assert!((config.search.abstain_threshold - 0.15).abs() < f32::EPSILON);
        assert_eq!(config.search.default_k, 5);
        assert_eq!(config.search.pool_size, 30);
        assert_eq!(config.search.normalizer, "minmax");
        assert_eq!(config.chunking.max_words, 350);
        assert_eq!(config.chunking.min_words, 80);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "data_dir = \"/tmp/corpus\"\n\n[search]\nalpha = 0.8\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/corpus"));
        assert!((config.search.alpha - 0.8).abs() < f32::EPSILON);
        // Untouched fields fall back to defaults
        assert_eq!(config.search.pool_size, 30);
        assert_eq!(config.chunking.max_words, 350);
    }

    #[test]
    fn test_artifact_paths() {
        let config = Config {
            data_dir: PathBuf::from("/corpus"),
            ..Config::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/corpus/chunks.db"));
        assert_eq!(
            config.vector_index_path(),
            PathBuf::from("/corpus/vectors.json")
        );
        assert_eq!(config.sources_path(), PathBuf::from("/corpus/sources.json"));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, DocragError::Config(_)));
    }
}
