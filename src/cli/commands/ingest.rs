//! docrag ingest - Chunk extracted documents into the corpus store
//!
//! Consumes a JSON array of pre-extracted documents (page text only; PDF
//! extraction happens upstream) and writes chunks to the SQLite store.
//! The vector index is NOT built here; run `docrag index` afterwards.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::config::Config;
use crate::error::{DocragError, Result};
use crate::ingest::{ExtractedDocument, ingest_document};
use crate::storage::sources::SourceCatalog;
use crate::storage::sqlite::ChunkStore;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// JSON file holding an array of extracted documents
    /// (`[{"source_id": ..., "pages": [{"page": 1, "text": ...}]}]`)
    pub input: PathBuf,

    /// Clear existing chunks (and the stale vector index) first
    #[arg(long)]
    pub rebuild: bool,
}

pub fn run(config: &Config, json: bool, args: &IngestArgs) -> Result<()> {
    // Titles are denormalized from the catalog at insert time, so the
    // catalog must exist before any chunk does.
    let catalog = SourceCatalog::load(config.sources_path())?;

    let raw = std::fs::read_to_string(&args.input).map_err(|err| {
        DocragError::Config(format!("read input {}: {err}", args.input.display()))
    })?;
    let documents: Vec<ExtractedDocument> = serde_json::from_str(&raw)?;

    let store = ChunkStore::open(config.db_path())?;
    if args.rebuild {
        store.clear()?;
        // Chunk ids restart from 1, so any existing vector index is
        // addressing the wrong corpus now.
        let index_path = config.vector_index_path();
        if index_path.exists() {
            std::fs::remove_file(&index_path)?;
            info!("removed stale vector index");
        }
    }

    let mut total = 0usize;
    let mut skipped = 0usize;
    for doc in &documents {
        let inserted = ingest_document(&store, &catalog, doc, config.chunking.max_words)?;
        if inserted == 0 && !doc.pages.is_empty() && catalog.get(&doc.source_id).is_none() {
            skipped += 1;
        }
        total += inserted;
    }

    if json {
        println!(
            "{}",
            serde_json::json!({
                "documents": documents.len(),
                "skipped": skipped,
                "chunks": total,
            })
        );
    } else {
        println!(
            "{} Ingested {} chunk(s) from {} document(s)",
            "✓".green(),
            total,
            documents.len()
        );
        if skipped > 0 {
            println!(
                "{} {} document(s) skipped (source_id not in catalog)",
                "!".yellow(),
                skipped
            );
        }
        println!("  Next: run {} to build the vector index", "docrag index".cyan());
    }
    Ok(())
}
