//! docrag ask - Ask a question against the corpus
//!
//! Runs the full retrieval flow: vector candidates, optional hybrid or
//! learned reranking, and the extractive answer policy. `--json` prints
//! the whole response for machine consumption.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::app::{AppContext, EngineOverrides};
use crate::config::Config;
use crate::error::Result;
use crate::search::engine::{QueryMode, QueryRequest, QueryResponse};

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question to answer
    pub query: String,

    /// Number of context chunks to return
    #[arg(long, short)]
    pub k: Option<usize>,

    /// Retrieval mode: hybrid (default) or baseline (vector only)
    #[arg(long, default_value = "hybrid")]
    pub mode: String,

    /// Fusion blend weight for the vector channel, overriding config
    #[arg(long)]
    pub alpha: Option<f32>,

    /// Rerank with a learned logistic model loaded from this JSON file
    #[arg(long, value_name = "FILE")]
    pub learned_weights: Option<PathBuf>,
}

pub fn run(config: Config, json: bool, args: &AskArgs) -> Result<()> {
    let mode: QueryMode = args.mode.parse()?;
    let k = args.k.unwrap_or(config.search.default_k);

    let overrides = EngineOverrides {
        alpha: args.alpha,
        learned_weights: args.learned_weights.clone(),
    };
    let app = AppContext::load_with(config, Some(overrides))?;

    let request = QueryRequest::new(args.query.clone()).k(k).mode(mode);
    let response = app.engine.ask(&request)?;

    if json {
        println!("{}", serde_json::to_string(&response)?);
    } else {
        print_human(&response);
    }
    Ok(())
}

fn print_human(response: &QueryResponse) {
    match &response.answer {
        Some(answer) => {
            println!("{}", answer.text.bold());
            if !answer.citation.is_empty() {
                println!("{} {}", "Source:".dimmed(), answer.citation.cyan());
            }
        }
        None => {
            println!(
                "{}",
                "No confident answer found in the corpus.".yellow()
            );
        }
    }

    if response.contexts.is_empty() {
        return;
    }

    println!();
    println!("{}", "Context:".dimmed());
    for (rank, ctx) in response.contexts.iter().enumerate() {
        let score = ctx.confidence();
        println!(
            "{:>3}. {} (p. {}, score {:.3})",
            rank + 1,
            ctx.title.bold(),
            ctx.page,
            score
        );
        let preview: String = ctx.text.chars().take(160).collect();
        println!("     {}", preview.dimmed());
    }
}
