//! Corpus ingestion
//!
//! Consumes pre-extracted page text (PDF/text extraction is an external
//! collaborator), chunks it, and stores the chunks with titles
//! denormalized from the source catalog. Ingestion is an offline build
//! step; it never runs concurrently with query serving.

pub mod chunker;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::storage::sources::SourceCatalog;
use crate::storage::sqlite::ChunkStore;

pub use chunker::{MAX_WORDS, MIN_WORDS, PageChunk, chunk_page, chunk_pages};

/// One extracted document: ordered pages of already-extracted text.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedDocument {
    pub source_id: String,
    pub pages: Vec<ExtractedPage>,
}

/// One page of extracted text, 1-based page number.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedPage {
    pub page: u32,
    pub text: String,
}

/// Chunk one document and insert its chunks into the store.
///
/// Returns the number of chunks inserted. Documents whose `source_id` is
/// not in the catalog are skipped with a warning, since no title or
/// citation could ever be attached to their chunks.
pub fn ingest_document(
    store: &ChunkStore,
    catalog: &SourceCatalog,
    doc: &ExtractedDocument,
    max_words: usize,
) -> Result<usize> {
    let Some(source) = catalog.get(&doc.source_id) else {
        warn!(source_id = %doc.source_id, "source not in catalog, skipping");
        return Ok(0);
    };

    let pages: Vec<(u32, String)> = doc
        .pages
        .iter()
        .map(|p| (p.page, p.text.clone()))
        .collect();
    let chunks = chunk_pages(&pages, max_words);

    let mut inserted = 0;
    for chunk in &chunks {
        store.insert_chunk(&doc.source_id, &source.title, i64::from(chunk.page), &chunk.text)?;
        inserted += 1;
    }

    info!(source_id = %doc.source_id, chunks = inserted, "ingested document");
    Ok(inserted)
}
