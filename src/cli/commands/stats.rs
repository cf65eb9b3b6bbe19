//! docrag stats - Show corpus statistics

use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::error::Result;
use crate::search::vector::VectorIndex;
use crate::storage::sources::SourceCatalog;
use crate::storage::sqlite::ChunkStore;

#[derive(Args, Debug)]
pub struct StatsArgs {}

pub fn run(config: &Config, json: bool, _args: &StatsArgs) -> Result<()> {
    let store = ChunkStore::open_existing(config.db_path())?;
    let chunks = store.count()?;

    // Stats stay readable mid-build, so missing downstream artifacts are
    // reported rather than fatal.
    let vectors = VectorIndex::load(config.vector_index_path())
        .map(|index| index.len() as u64)
        .ok();
    let sources = SourceCatalog::load(config.sources_path())
        .map(|catalog| catalog.len() as u64)
        .ok();
    let consistent = vectors == Some(chunks);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "data_dir": config.data_dir.display().to_string(),
                "chunks": chunks,
                "vectors": vectors,
                "sources": sources,
                "consistent": consistent,
            })
        );
    } else {
        println!("{} {}", "Data dir:".dimmed(), config.data_dir.display());
        println!("{} {}", "Chunks:".dimmed(), chunks);
        match vectors {
            Some(n) => println!("{} {}", "Vectors:".dimmed(), n),
            None => println!("{} {}", "Vectors:".dimmed(), "not built".yellow()),
        }
        match sources {
            Some(n) => println!("{} {}", "Sources:".dimmed(), n),
            None => println!("{} {}", "Sources:".dimmed(), "missing".yellow()),
        }
        if consistent {
            println!("{} chunk and vector counts match", "✓".green());
        } else {
            println!(
                "{} vector index out of sync; run {}",
                "!".yellow(),
                "docrag index".cyan()
            );
        }
    }
    Ok(())
}
