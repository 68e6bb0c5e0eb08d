use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

mod error;
mod extract;
mod orchestrator;
mod packet;
mod pcap_reader;
mod protocol;
mod sink;
mod stats;
mod worker;

use error::ExtractError;
use orchestrator::{DEFAULT_OUTPUT, RunConfig, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "pcap-csv-extractor")]
#[command(about = "Extract IPv4 packet metadata from split pcap files into one CSV")]
#[command(version)]
struct Args {
    /// Capture files to process (e.g. the parts written by `editcap -c`)
    files: Vec<PathBuf>,

    /// CSV file to write; overwritten on every run
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Number of top source/destination addresses in the run summary
    #[arg(short, long, default_value = "5")]
    top: usize,

    /// Verbose logging (default: false)
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

/// Process status for a finished run: 1 when the run could not start, 0
/// otherwise, whatever happened to individual files.
fn exit_status(result: &error::Result<RunSummary>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let config = RunConfig {
        output: args.output,
        top_talkers: args.top,
    };

    let result = orchestrator::run(&args.files, &config);
    let status = exit_status(&result);

    match result {
        Ok(summary) => info!(
            "Multithreaded processing finished: {} of {} file(s) completed",
            summary.reports.len(),
            args.files.len()
        ),
        Err(ExtractError::Usage) => eprintln!("{}", Args::command().render_usage()),
        Err(e) => return Err(e).context("Extraction aborted"),
    }

    Ok(ExitCode::from(status))
}
