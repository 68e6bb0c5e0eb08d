use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{ExtractError, Result};
use crate::sink::RecordSink;
use crate::stats::{RunStats, StatsSnapshot};
use crate::worker::{Worker, WorkerReport};

pub const DEFAULT_OUTPUT: &str = "data.csv";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub output: PathBuf,
    pub top_talkers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            top_talkers: 5,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<WorkerReport>,
    pub failures: Vec<ExtractError>,
    pub stats: StatsSnapshot,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn records_written(&self) -> u64 {
        self.reports.iter().map(|r| r.records_written).sum()
    }

    pub fn frames_skipped(&self) -> u64 {
        self.reports.iter().map(|r| r.frames_skipped).sum()
    }
}

/// Extract every capture in `files` into the CSV at `config.output`.
///
/// One thread per file; all of them share one sink. Per-file failures are
/// logged and collected in the summary, they never fail the run. Only a
/// missing file list or an unwritable output does.
pub fn run(files: &[PathBuf], config: &RunConfig) -> Result<RunSummary> {
    if files.is_empty() {
        return Err(ExtractError::Usage);
    }

    let start_time = Instant::now();
    let sink = Arc::new(RecordSink::create(&config.output)?);
    let stats = Arc::new(RunStats::new());

    info!(
        "Extracting {} capture file(s) into {}",
        files.len(),
        config.output.display()
    );

    let mut handles = Vec::with_capacity(files.len());
    for (id, path) in files.iter().enumerate() {
        let worker = Worker::new(id, path.clone(), sink.clone(), stats.clone());
        let spawned = thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || worker.run());

        handles.push((path.clone(), spawned));
    }

    let mut reports = Vec::with_capacity(files.len());
    let mut failures = Vec::new();

    for (path, handle) in handles {
        let outcome = match handle {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(ExtractError::WorkerPanicked { path: path.clone() })),
            Err(source) => Err(ExtractError::WorkerSpawn {
                path: path.clone(),
                source,
            }),
        };

        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                failures.push(e);
            }
        }
    }

    if let Err(e) = sink.flush() {
        warn!("Failed to flush {}: {}", config.output.display(), e);
        failures.push(e);
    }

    let summary = RunSummary {
        reports,
        failures,
        stats: stats.snapshot(config.top_talkers),
        elapsed_secs: start_time.elapsed().as_secs_f64(),
    };
    log_summary(&summary, &config.output);

    Ok(summary)
}

fn log_summary(summary: &RunSummary, output: &Path) {
    let stats = &summary.stats;

    info!("======= EXTRACTION SUMMARY =======");
    info!("Total time: {:.2} seconds", summary.elapsed_secs);
    info!(
        "Workers: {} finished, {} failed",
        summary.reports.len(),
        summary.failures.len()
    );
    info!(
        "Records written: {} ({} frames skipped)",
        summary.records_written(),
        summary.frames_skipped()
    );
    info!(
        "Protocols: TCP={} UDP={} ICMP={} OUTRO={}",
        stats.tcp, stats.udp, stats.icmp, stats.other
    );
    if let (Some(min), Some(max), Some(mean)) =
        (stats.min_length, stats.max_length, stats.mean_length)
    {
        info!(
            "Frame length: min={} max={} mean={:.2} std_dev={:.2}",
            min,
            max,
            mean,
            stats.std_dev_length.unwrap_or(0.0)
        );
    }
    if !stats.top_sources.is_empty() {
        info!("Top sources: {:?}", stats.top_sources);
        info!("Top destinations: {:?}", stats.top_destinations);
    }
    info!("Output: {}", output.display());
    info!("==================================");
}
