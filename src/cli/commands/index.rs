//! docrag index - Embed all chunks and build the vector index
//!
//! Walks the chunk table in id order, embeds each chunk, and writes the
//! vector index artifact. Slot positions are written back to the chunk
//! table so queries can resolve vector hits to chunks.

use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::config::Config;
use crate::embedding::{Embedder, build_embedder};
use crate::error::Result;
use crate::search::vector::VectorIndex;
use crate::storage::sqlite::ChunkStore;

#[derive(Args, Debug)]
pub struct IndexArgs {}

pub fn run(config: &Config, json: bool, _args: &IndexArgs) -> Result<()> {
    let store = ChunkStore::open_existing(config.db_path())?;
    let embedder = build_embedder(&config.search)?;

    let chunks = store.all_chunks()?;
    let mut index = VectorIndex::new(embedder.dims());

    // Id order keeps slot assignment deterministic across rebuilds.
    for chunk in &chunks {
        let slot = index.add(embedder.embed(&chunk.text))?;
        store.set_embedding_slot(chunk.id, slot as i64)?;
    }

    index.save(config.vector_index_path())?;
    info!(
        vectors = index.len(),
        dims = index.dims(),
        path = %config.vector_index_path().display(),
        "vector index written"
    );

    if json {
        println!(
            "{}",
            serde_json::json!({
                "vectors": index.len(),
                "dims": index.dims(),
            })
        );
    } else {
        println!(
            "{} Indexed {} chunk(s) ({} dims) into {}",
            "✓".green(),
            index.len(),
            index.dims(),
            config.vector_index_path().display()
        );
    }
    Ok(())
}
