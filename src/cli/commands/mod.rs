//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::Result;

pub mod ask;
pub mod eval;
pub mod index;
pub mod ingest;
pub mod stats;

/// Dispatch a command to its handler
pub fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    match &cli.command {
        Commands::Ingest(args) => ingest::run(&config, cli.json, args),
        Commands::Index(args) => index::run(&config, cli.json, args),
        Commands::Ask(args) => ask::run(config, cli.json, args),
        Commands::Eval(args) => eval::run(config, cli.json, args),
        Commands::Stats(args) => stats::run(&config, cli.json, args),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}
