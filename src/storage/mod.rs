//! Persistent corpus artifacts: the SQLite chunk table and the source
//! catalog. The serialized vector index lives with the search module.

pub mod sources;
pub mod sqlite;

pub use sources::{Source, SourceCatalog};
pub use sqlite::{ChunkRecord, ChunkStore};
