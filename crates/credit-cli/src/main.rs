//! Wallet credit scoring CLI
//!
//! Usage:
//!   score-wallets user-transactions.json
//!   score-wallets user-transactions.json -o scores.json --analysis analysis.md

mod config;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use credit_core::analysis::render_analysis;
use credit_core::report::ScoringReport;
use credit_core::CreditScorer;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "score-wallets")]
#[command(about = "Score DeFi lending wallets from a transaction dump")]
struct Args {
    /// Path to the transaction JSON file
    input: PathBuf,

    /// Output file for scores
    #[arg(short, long, default_value = "wallet_scores.json")]
    output: PathBuf,

    /// Also write a markdown analysis to this path
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// Scoring configuration file (toml, yaml or json)
    #[arg(long, env = "CREDIT_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "score_wallets=info,credit_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    let args = Args::parse();

    println!("================================================");
    println!("        DEFI WALLET CREDIT SCORING              ");
    println!("================================================");

    let report = run(&args)?;

    println!();
    println!("=== SCORING COMPLETE ===");
    println!("Total wallets scored: {}", report.total_wallets_scored);
    println!("Average score: {:.2}", report.analysis.average_score);
    println!("Median score: {:.2}", report.analysis.median_score);
    println!("High-risk wallets (< 300): {}", report.analysis.high_risk_wallets);
    println!("Excellent wallets (> 800): {}", report.analysis.excellent_wallets);
    println!("Results saved to {}", args.output.display());
    if let Some(path) = &args.analysis {
        println!("Analysis saved to {}", path.display());
    }

    Ok(())
}

fn run(args: &Args) -> Result<ScoringReport> {
    let config = crate::config::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    println!(
        "[CONFIG] Wallet fields: {}",
        config.fields.wallet.join(", ")
    );
    println!(
        "[CONFIG] Bot velocity threshold: {} tx/day",
        config.weights.bot_velocity_threshold
    );

    let scorer = CreditScorer::new(config)?;

    println!("[LOAD] Reading transactions from {}...", args.input.display());
    let raw = read_ledger(&args.input)?;

    let batch = scorer
        .run(&raw)
        .with_context(|| format!("Failed to score {}", args.input.display()))?;

    let stats = batch.table.stats();
    println!(
        "[LOAD] {} records, {} events, {} dropped",
        stats.records_seen,
        batch.table.event_count(),
        stats.records_dropped
    );

    let report = ScoringReport::assemble(batch.scores(), stats, Utc::now());
    for (field, key) in &report.field_mappings {
        tracing::info!(field = %field, source = key.as_deref().unwrap_or("<none>"), "Field mapping");
    }

    write_json(&args.output, &report)?;

    if let Some(path) = &args.analysis {
        let markdown = render_analysis(&report, &batch.wallets, &scorer.config().weights);
        fs::write(path, markdown)
            .with_context(|| format!("Failed to write analysis to {}", path.display()))?;
    }

    Ok(report)
}

fn read_ledger(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{} is not valid JSON", path.display()))
}

fn write_json(path: &Path, report: &ScoringReport) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write scores to {}", path.display()))?;

    tracing::info!(path = %path.display(), wallets = report.total_wallets_scored, "Wrote scores");
    Ok(())
}
