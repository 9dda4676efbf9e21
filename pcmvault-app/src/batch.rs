//! Concurrent ingest → trim → SNR over many files.
//!
//! Every file runs on a blocking worker; a semaphore caps how many run at
//! once. One failing file never aborts the others.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use pcmvault_core::{SnrMeasurement, TrimResult};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::commands;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim: Option<TrimResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snr: Option<SnrMeasurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: f64,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<BatchOutcome>,
}

/// Expand directories into the `.wav` files beneath them, sorted per directory.
pub fn collect_inputs(inputs: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            collect_wavs(input, &mut out)?;
        } else {
            out.push(input.clone());
        }
    }
    Ok(out)
}

fn collect_wavs(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_wavs(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Process every file; outcomes come back in input order.
pub async fn run_batch(state: Arc<AppState>, paths: Vec<PathBuf>) -> BatchReport {
    let workers = state.settings.batch_workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let outcomes: Arc<Mutex<Vec<(usize, BatchOutcome)>>> =
        Arc::new(Mutex::new(Vec::with_capacity(paths.len())));
    info!(files = paths.len(), workers, "batch started");

    let mut handles = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().cloned().enumerate() {
        let state = Arc::clone(&state);
        let semaphore = Arc::clone(&semaphore);
        let outcomes = Arc::clone(&outcomes);
        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                outcomes.lock().push((index, failed(path, "batch worker pool closed".into(), 0.0)));
                return;
            };
            let worker_path = path.clone();
            let outcome = match tokio::task::spawn_blocking(move || process_file(&state, &worker_path)).await {
                Ok(outcome) => outcome,
                Err(e) => failed(path, format!("worker panicked: {e}"), 0.0),
            };
            outcomes.lock().push((index, outcome));
        }));
    }

    for (index, handle) in handles.into_iter().enumerate() {
        if let Err(e) = handle.await {
            warn!(path = %paths[index].display(), "batch task join error: {e}");
            outcomes
                .lock()
                .push((index, failed(paths[index].clone(), format!("batch task failed: {e}"), 0.0)));
        }
    }

    let collected = std::mem::take(&mut *outcomes.lock());
    let report = assemble_report(&paths, collected);
    info!(
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        "batch finished"
    );
    report
}

/// Order outcomes by input index. An input with no outcome counts as failed.
fn assemble_report(paths: &[PathBuf], collected: Vec<(usize, BatchOutcome)>) -> BatchReport {
    let mut slots: Vec<Option<BatchOutcome>> = vec![None; paths.len()];
    for (index, outcome) in collected {
        if let Some(slot) = slots.get_mut(index) {
            slot.get_or_insert(outcome);
        }
    }
    let outcomes: Vec<BatchOutcome> = slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| failed(path.clone(), "no outcome recorded".into(), 0.0))
        })
        .collect();
    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    BatchReport {
        total: paths.len(),
        succeeded,
        failed: paths.len() - succeeded,
        outcomes,
    }
}

fn process_file(state: &AppState, path: &Path) -> BatchOutcome {
    let started = Instant::now();
    let elapsed = |started: Instant| started.elapsed().as_secs_f64() * 1000.0;

    let asset = match commands::source_asset(state, path, None) {
        Ok(asset) => asset,
        Err(e) => return failed(path.to_path_buf(), format!("{e:#}"), elapsed(started)),
    };
    let trim = match commands::trim(state, path, Some(&asset.id), &state.settings.silence_params()) {
        Ok(report) => report.result,
        Err(e) => {
            warn!(path = %path.display(), "batch trim failed: {e:#}");
            return BatchOutcome {
                asset_id: Some(asset.id),
                ..failed(path.to_path_buf(), format!("{e:#}"), elapsed(started))
            };
        }
    };
    let snr = commands::snr(state, path, Some(&asset.id), &state.settings.snr_params());

    match snr {
        Ok(report) => BatchOutcome {
            path: path.to_path_buf(),
            asset_id: Some(asset.id),
            trim: Some(trim),
            snr: Some(report.measurement),
            error: None,
            elapsed_ms: elapsed(started),
        },
        Err(e) => {
            warn!(path = %path.display(), "batch snr failed: {e:#}");
            BatchOutcome {
                asset_id: Some(asset.id),
                trim: Some(trim),
                ..failed(path.to_path_buf(), format!("{e:#}"), elapsed(started))
            }
        }
    }
}

fn failed(path: PathBuf, error: String, elapsed_ms: f64) -> BatchOutcome {
    BatchOutcome {
        path,
        asset_id: None,
        trim: None,
        snr: None,
        error: Some(error),
        elapsed_ms,
    }
}
