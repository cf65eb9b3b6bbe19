//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;

/// docrag - Hybrid retrieval over a local document corpus, with cited
/// extractive answers
#[derive(Parser, Debug)]
#[command(name = "docrag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Machine-readable JSON output on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/docrag/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Corpus data directory, overriding config
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk extracted documents into the corpus store
    Ingest(commands::ingest::IngestArgs),

    /// Embed all chunks and build the vector index
    Index(commands::index::IndexArgs),

    /// Ask a question against the corpus
    Ask(commands::ask::AskArgs),

    /// Compare baseline and hybrid retrieval on a question set
    Eval(commands::eval::EvalArgs),

    /// Show corpus statistics
    Stats(commands::stats::StatsArgs),
}
