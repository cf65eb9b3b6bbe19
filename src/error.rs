use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocragError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Search index error: {0}")]
    SearchIndex(#[from] tantivy::TantivyError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing corpus artifact: {0}")]
    MissingArtifact(String),

    #[error("Chunk not found: {0}")]
    ChunkNotFound(i64),

    #[error("Invalid query argument: {0}")]
    InvalidQuery(String),

    #[error("Embedding error: {0}")]
    Embedding(String),
}

pub type Result<T> = std::result::Result<T, DocragError>;
