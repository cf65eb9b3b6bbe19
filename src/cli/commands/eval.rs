//! docrag eval - Compare baseline and hybrid retrieval on a question set
//!
//! Runs every question through both retrieval modes and reports, per
//! query, whether any returned context contains one of the expected
//! keywords. A cheap retrieval-quality check for tuning alpha or judging
//! whether the lexical channel earns its keep on a given corpus.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::app::AppContext;
use crate::config::Config;
use crate::error::{DocragError, Result};
use crate::search::engine::{ContextChunk, QueryMode, QueryRequest};

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// JSON file holding the question set
    /// (`[{"id": ..., "q": ..., "expected_keywords": [...]}]`)
    pub questions: PathBuf,

    /// Number of context chunks to judge per query
    #[arg(long, short, default_value_t = 5)]
    pub k: usize,
}

#[derive(Debug, Deserialize)]
pub struct EvalQuestion {
    pub id: String,
    pub q: String,
    pub expected_keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EvalRow {
    id: String,
    query: String,
    baseline_hit: bool,
    hybrid_hit: bool,
}

pub fn run(config: Config, json: bool, args: &EvalArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.questions).map_err(|err| {
        DocragError::Config(format!(
            "read question set {}: {err}",
            args.questions.display()
        ))
    })?;
    let questions: Vec<EvalQuestion> = serde_json::from_str(&raw)?;

    let app = AppContext::load(config)?;

    let mut rows = Vec::with_capacity(questions.len());
    for question in &questions {
        let baseline = app.engine.ask(
            &QueryRequest::new(question.q.clone())
                .k(args.k)
                .mode(QueryMode::Baseline),
        )?;
        let hybrid = app
            .engine
            .ask(&QueryRequest::new(question.q.clone()).k(args.k))?;

        rows.push(EvalRow {
            id: question.id.clone(),
            query: question.q.clone(),
            baseline_hit: contains_expected(&baseline.contexts, &question.expected_keywords),
            hybrid_hit: contains_expected(&hybrid.contexts, &question.expected_keywords),
        });
    }

    let baseline_hits = rows.iter().filter(|r| r.baseline_hit).count();
    let hybrid_hits = rows.iter().filter(|r| r.hybrid_hit).count();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "questions": rows.len(),
                "baseline_hits": baseline_hits,
                "hybrid_hits": hybrid_hits,
                "results": rows,
            })
        );
    } else {
        for row in &rows {
            println!(
                "{:<12} baseline {}  hybrid {}  {}",
                row.id,
                mark(row.baseline_hit),
                mark(row.hybrid_hit),
                row.query.dimmed()
            );
        }
        println!(
            "{} baseline {}/{}, hybrid {}/{}",
            "Hit rate:".bold(),
            baseline_hits,
            rows.len(),
            hybrid_hits,
            rows.len()
        );
    }
    Ok(())
}

/// True when any returned context contains any expected keyword,
/// case-insensitively.
fn contains_expected(contexts: &[ContextChunk], keywords: &[String]) -> bool {
    contexts.iter().any(|ctx| {
        let text = ctx.text.to_lowercase();
        keywords.iter().any(|k| text.contains(&k.to_lowercase()))
    })
}

fn mark(hit: bool) -> colored::ColoredString {
    if hit { "✓".green() } else { "✗".red() }
}
