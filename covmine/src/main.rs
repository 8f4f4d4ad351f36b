//! # covmine - Main Entry Point
//!
//! Loads a recorded trace, replays it through the coverage miner on a worker
//! pool, prints a summary and optionally exports the JSON coverage report.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

use covmine::cli::Args;
use covmine::domain::{ReplayError, TraceError};
use covmine::export::{print_groups, print_summary};
use covmine::replay::{CoverageMiner, ReplayDriver, Trace};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let invalid_input = err.chain().any(|cause| {
        let bad_trace = matches!(
            cause.downcast_ref::<TraceError>(),
            Some(TraceError::Json(_) | TraceError::InvalidSegmentBounds { .. })
        );
        let bad_pool = matches!(cause.downcast_ref::<ReplayError>(), Some(ReplayError::NoWorkers));
        bad_trace || bad_pool
    });
    if invalid_input {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let trace = Trace::from_file(&args.trace)
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;

    let config = args.miner_config();
    let driver = ReplayDriver::new(args.worker_count());

    if !quiet {
        println!("covmine v{}", env!("CARGO_PKG_VERSION"));
        println!("trace: {}", args.trace.display());
        println!("segments: {}", trace.segments.len());
        println!("workers: {}", driver.workers());
        println!("merge: {}", if config.offload { "background" } else { "inline" });
        if let Some(ref export_path) = args.export {
            println!("export: {}", export_path.display());
        }
    }

    let started = Instant::now();
    let mut miner = CoverageMiner::new(&config);
    let sink = miner.sink();
    let summary = driver.run(&trace, &*sink, &mut miner).context("Replay failed")?;
    let report = miner.into_report();
    info!("Mining took {:.3}s", started.elapsed().as_secs_f64());

    if !quiet {
        print_groups(&report);
        print_summary(&summary, &report.stats);
    }

    if let Some(ref export_path) = args.export {
        let file = File::create(export_path).context("Failed to create report output file")?;
        let writer = BufWriter::new(file);
        report.export(writer).context("Failed to export coverage report")?;

        if !quiet {
            println!("saved: {}", export_path.display());
        }
    }

    Ok(())
}
