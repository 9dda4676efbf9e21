//! pcmvault command-line entry point.
//!
//! Results go to stdout as JSON; logs go to stderr.

mod batch;
mod cli;
mod commands;
mod settings;
mod state;
mod storage;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use cli::Command;
use pcmvault_core::{AudioEngine, NoiseStrategy};
use serde::Serialize;
use settings::{default_settings_path, load_settings, save_settings};
use state::AppState;
use tracing::{error, info};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pcmvault=info,pcmvault_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::parse_args(std::env::args().skip(1)).map_err(|e| anyhow::anyhow!("{e}\n\n{}", cli::USAGE))?;
    if cli.command == Command::Help {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    let settings_path = cli.settings_path.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    if let Some(db) = &cli.db_path {
        settings.database_path = Some(db.clone());
    }
    info!(settings = %settings_path.display(), "settings loaded");

    if let Command::Settings { save } = cli.command {
        if save {
            save_settings(&settings_path, &settings)
                .with_context(|| format!("writing {}", settings_path.display()))?;
            info!(path = %settings_path.display(), "settings saved");
        }
        return print_json(&settings);
    }

    let state = AppState::new(settings)?;
    match cli.command {
        Command::Ingest { path } => print_json(&commands::ingest(&state, &path)?),
        Command::Trim {
            path,
            asset_id,
            threshold,
            min_silence,
            trailing_scan,
            output_dir,
        } => {
            let mut params = state.settings.silence_params();
            if let Some(t) = threshold {
                params.threshold = t;
            }
            if let Some(secs) = min_silence {
                params.min_silence_secs = secs;
            }
            if let Some(scan) = trailing_scan {
                params.trailing_scan = scan;
            }
            let mut state = state;
            if let Some(dir) = output_dir {
                let mut config = state.engine.config().clone();
                config.output_dir = Some(dir);
                state.engine = AudioEngine::new(config);
            }
            print_json(&commands::trim(&state, &path, asset_id.as_deref(), &params)?)
        }
        Command::Snr {
            path,
            asset_id,
            noise_threshold,
            silent_segments,
        } => {
            let mut params = state.settings.snr_params();
            if let Some(t) = noise_threshold {
                params.noise_threshold = t;
            }
            if silent_segments {
                params.strategy = NoiseStrategy::SilentSegments;
            }
            print_json(&commands::snr(&state, &path, asset_id.as_deref(), &params)?)
        }
        Command::Batch { inputs } => {
            let paths = batch::collect_inputs(&inputs).context("collecting batch inputs")?;
            anyhow::ensure!(!paths.is_empty(), "no .wav files found in batch inputs");
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("starting batch runtime")?;
            let report = runtime.block_on(batch::run_batch(Arc::new(state), paths));
            print_json(&report)?;
            anyhow::ensure!(report.failed == 0, "{} of {} files failed", report.failed, report.total);
            Ok(())
        }
        Command::Features { asset_id } => print_json(&commands::features(&state, &asset_id)?),
        Command::Settings { .. } | Command::Help => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
