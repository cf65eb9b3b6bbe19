//! SQLite chunk table
//!
//! The chunk table is the system of record for retrievable units and the
//! only holder of the `embedding_slot -> chunk_id` mapping; the vector
//! index knows nothing but positional slots. The column layout
//! `(source_id, title, page, chunk_text, chunk_len, embedding_id)` is
//! format-significant for compatibility with existing corpora.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{DocragError, Result};

/// SQLite-backed chunk store.
pub struct ChunkStore {
    conn: Connection,
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore").finish_non_exhaustive()
    }
}

/// One stored chunk. Immutable after ingestion except for
/// `embedding_slot`, which the index build step sets exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Stable integer id, assigned in insertion order.
    pub id: i64,
    pub source_id: String,
    /// Title denormalized from the source at ingestion time.
    pub title: String,
    /// 1-based page number.
    pub page: i64,
    pub text: String,
    /// Whitespace-tokenized word count of `text`.
    pub word_count: i64,
    /// Position of this chunk's vector in the vector index; absent until
    /// the embedding has been computed.
    pub embedding_slot: Option<i64>,
}

impl ChunkStore {
    /// Open (creating if needed) the chunk store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an existing chunk store, refusing to create one.
    ///
    /// Serving must never start against an empty implicit corpus; a
    /// missing DB file is a configuration failure.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocragError::MissingArtifact(format!(
                "chunk store not found at {}; run `docrag ingest` first",
                path.display()
            )));
        }
        Self::open(path)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id TEXT NOT NULL,
                title TEXT NOT NULL,
                page INTEGER NOT NULL,
                chunk_text TEXT NOT NULL,
                chunk_len INTEGER NOT NULL,
                embedding_id INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_embedding_id
                ON chunks(embedding_id);",
        )?;
        Ok(())
    }

    /// Insert a chunk, assigning the next id in insertion order.
    ///
    /// `chunk_len` is derived here from the whitespace-tokenized text so
    /// callers cannot desynchronize it.
    pub fn insert_chunk(
        &self,
        source_id: &str,
        title: &str,
        page: i64,
        text: &str,
    ) -> Result<i64> {
        let word_count = text.split_whitespace().count() as i64;
        self.conn.execute(
            "INSERT INTO chunks (source_id, title, page, chunk_text, chunk_len)
             VALUES (?, ?, ?, ?, ?)",
            params![source_id, title, page, text, word_count],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_chunk(&self, id: i64) -> Result<Option<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_id, title, page, chunk_text, chunk_len, embedding_id
             FROM chunks WHERE id = ?",
        )?;
        let record = stmt
            .query_row([id], |row| chunk_from_row(row))
            .optional()?;
        Ok(record)
    }

    /// Resolve a vector-index slot back to its chunk.
    pub fn chunk_by_slot(&self, slot: i64) -> Result<Option<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_id, title, page, chunk_text, chunk_len, embedding_id
             FROM chunks WHERE embedding_id = ? LIMIT 1",
        )?;
        let record = stmt
            .query_row([slot], |row| chunk_from_row(row))
            .optional()?;
        Ok(record)
    }

    /// Record the chunk's position in the vector index.
    pub fn set_embedding_slot(&self, id: i64, slot: i64) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE chunks SET embedding_id = ? WHERE id = ?",
            params![slot, id],
        )?;
        if updated == 0 {
            return Err(DocragError::ChunkNotFound(id));
        }
        Ok(())
    }

    /// All chunks in id (insertion) order. Both indexes are built from
    /// this exact sequence so their id spaces cannot drift.
    pub fn all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_id, title, page, chunk_text, chunk_len, embedding_id
             FROM chunks ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| chunk_from_row(row))?;
        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row?);
        }
        Ok(chunks)
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Drop all chunks ahead of a full corpus rebuild.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM chunks", [])?;
        // Reset AUTOINCREMENT so a rebuild reassigns ids from 1.
        self.conn
            .execute("DELETE FROM sqlite_sequence WHERE name = 'chunks'", [])
            .ok();
        Ok(())
    }
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
    Ok(ChunkRecord {
        id: row.get(0)?,
        source_id: row.get(1)?,
        title: row.get(2)?,
        page: row.get(3)?,
        text: row.get(4)?,
        word_count: row.get(5)?,
        embedding_slot: row.get(6)?,
    })
}
