//! WAF rule engine CLI: validate a rule file, evaluate a single request
//! fixture against it, or throughput-benchmark it.

mod bench;
mod eval;
mod logging;

use std::fs;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use waf_core::types::Phase;
use waf_loader::load_engine;

#[derive(Parser)]
#[command(name = "waf-cli")]
#[command(about = "Validate, evaluate, and benchmark WAF rule files")]
struct Cli {
    /// Write logs to this file in addition to stderr
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// Minimum log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a rule file and report per-phase rule counts
    Check {
        /// Rule directive file
        #[arg(short, long)]
        rules: String,
    },

    /// Evaluate a single JSON request fixture against a rule file
    Eval {
        /// Rule directive file
        #[arg(short, long)]
        rules: String,

        /// JSON request fixture file
        #[arg(short = 'f', long)]
        fixture: String,
    },

    /// Replay a synthetic request corpus and report throughput
    Bench {
        /// Rule directive file
        #[arg(short, long)]
        rules: String,

        /// Corpus repetitions
        #[arg(short, long, default_value = "10000")]
        iterations: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.log_level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    };
    if let Err(e) = logging::init(cli.log_file.as_deref(), level) {
        eprintln!("warning: logging not initialized: {e}");
    }

    let result = match cli.command {
        Commands::Check { rules } => cmd_check(&rules),
        Commands::Eval { rules, fixture } => cmd_eval(&rules, &fixture),
        Commands::Bench { rules, iterations } => cmd_bench(&rules, iterations),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_rules(path: &str) -> Result<waf_core::types::RuleEngine, String> {
    let source = fs::read_to_string(path).map_err(|e| format!("failed to read '{path}': {e}"))?;
    load_engine(&source).map_err(|e| format!("{path}: {e}"))
}

fn cmd_check(rules_path: &str) -> Result<(), String> {
    let engine = read_rules(rules_path)?;

    println!("Rule file '{rules_path}' loaded successfully");
    println!(
        "  REQUEST_HEADER:  {} rule(s)",
        engine.rules_for(Phase::REQUEST_HEADER).len()
    );
    println!(
        "  REQUEST_BODY:    {} rule(s)",
        engine.rules_for(Phase::REQUEST_BODY).len()
    );
    println!(
        "  RESPONSE_HEADER: {} rule(s)",
        engine.rules_for(Phase::RESPONSE_HEADER).len()
    );
    println!(
        "  RESPONSE_BODY:   {} rule(s)",
        engine.rules_for(Phase::RESPONSE_BODY).len()
    );
    println!("  block_list:      {} entries", engine.block_list.len());
    println!("  conn_processor:  {}", engine.conn_processor);

    Ok(())
}

fn cmd_eval(rules_path: &str, fixture_path: &str) -> Result<(), String> {
    let engine = read_rules(rules_path)?;

    let fixture_json =
        fs::read_to_string(fixture_path).map_err(|e| format!("failed to read '{fixture_path}': {e}"))?;
    let fixture: eval::FixtureRequest = serde_json::from_str(&fixture_json)
        .map_err(|e| format!("invalid request fixture '{fixture_path}': {e}"))?;

    let decision = eval::evaluate_fixture(&engine, &fixture)
        .map_err(|e| format!("evaluation failed: {e}"))?;
    let rendered = serde_json::to_string_pretty(&decision)
        .map_err(|e| format!("failed to render decision: {e}"))?;
    println!("{rendered}");

    Ok(())
}

fn cmd_bench(rules_path: &str, iterations: usize) -> Result<(), String> {
    let engine = read_rules(rules_path)?;
    let report = bench::run(&engine, iterations);

    println!("Requests:     {}", report.requests);
    println!("Matched:      {}", report.matched);
    println!("Elapsed:      {:.3}s", report.elapsed_secs);
    println!("Throughput:   {:.0} req/s", report.requests_per_sec);

    let snapshot = engine.counters.snapshot();
    println!(
        "Counters:     matched={} logged={} allowed={} blocked={}",
        snapshot.request_matched,
        snapshot.request_logged,
        snapshot.request_allowed,
        snapshot.request_blocked
    );

    Ok(())
}
