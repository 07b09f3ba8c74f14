//! perfcache-bench - load tool for the performance counter cache
//!
//! Builds a counter facade over the in-memory counter subsystem, warms one
//! category, then hammers a single integer key from many threads and checks
//! that no increment was lost.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release -p perfcache-bench -- --threads 16 --iterations 100000
//!
//! # Ratio counter: plain increments advance the base
//! cargo run --release -p perfcache-bench -- --counter-type AverageTimer32 --key-strategy sequential
//! ```

mod load;

use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use perfcache_api::CounterType;
use perfcache_core::KeyStrategy;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::load::{LoadPlan, LoadReport};

#[derive(Parser, Debug)]
#[command(name = "perfcache-bench")]
#[command(about = "Concurrent increment load against the counter cache", long_about = None)]
struct Args {
    /// Number of worker threads
    #[arg(long, default_value = "8")]
    threads: usize,

    /// Increments per worker thread
    #[arg(long, default_value = "100000")]
    iterations: usize,

    /// Algorithm kind of the load counter
    #[arg(long, default_value = "NumberOfItems64", value_parser = parse_counter_type)]
    counter_type: CounterType,

    /// Key derivation strategy
    #[arg(long, default_value = "hash", value_parser = parse_key_strategy)]
    key_strategy: KeyStrategy,

    /// Log filter, e.g. "info" or "perfcache_core=debug"
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_counter_type(s: &str) -> Result<CounterType, String> {
    CounterType::parse(s).ok_or_else(|| format!("unknown counter type '{}'", s))
}

fn parse_key_strategy(s: &str) -> Result<KeyStrategy, String> {
    KeyStrategy::parse(s).ok_or_else(|| format!("unknown key strategy '{}'", s))
}

fn init_logging(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter).with_context(|| format!("invalid log filter '{}'", filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

fn print_report(plan: &LoadPlan, report: &LoadReport) {
    println!("perfcache Load Benchmark");
    println!("========================");
    println!("  Threads:      {:>12}", plan.threads);
    println!("  Iterations:   {:>12}", plan.iterations);
    println!("  Counter type: {:>12}", plan.counter_type);
    println!("  Key strategy: {:>12}", plan.key_strategy.as_str());
    println!();
    println!("  Total time:   {:>10.2}ms", report.elapsed.as_secs_f64() * 1000.0);
    println!("  Throughput:   {:>10.0} ops/sec", report.throughput());
    println!(
        "  Counted:      {:>12} of {} ({})",
        report.observed,
        report.expected(),
        if report.advanced_base { "base" } else { "counter" }
    );
    println!("  Exact:        {:>12}", report.is_exact());
}

fn run(args: Args) -> Result<bool> {
    init_logging(&args.log_level)?;

    if args.threads == 0 {
        return Err(anyhow!("--threads must be at least 1"));
    }

    let plan = LoadPlan {
        threads: args.threads,
        iterations: args.iterations,
        counter_type: args.counter_type,
        key_strategy: args.key_strategy,
    };
    let report = load::run(&plan).context("load run failed")?;
    info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        observed = report.observed,
        expected = report.expected(),
        "Load complete"
    );
    print_report(&plan, &report);
    Ok(report.is_exact())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("Final raw value does not match the number of increments");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("perfcache-bench: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
