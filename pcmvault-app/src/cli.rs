//! Command-line parsing.

use std::path::PathBuf;

use pcmvault_core::TrailingScan;

pub const USAGE: &str = "\
Usage: pcmvault [--settings <file.json>] [--db <file.db>] <command>

Commands:
  ingest <file.wav>
  trim <file.wav> [--asset-id <id>] [--threshold <0..1>] [--min-silence <secs>]
                  [--exact | --early-exit] [--output-dir <dir>]
  snr <file.wav> [--asset-id <id>] [--noise-threshold <0..1>] [--silent-segments]
  batch <file.wav | dir>...
  features <asset-id>
  settings [--save]

Logging is controlled by RUST_LOG (default: pcmvault=info,pcmvault_core=info).";

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub settings_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ingest {
        path: PathBuf,
    },
    Trim {
        path: PathBuf,
        asset_id: Option<String>,
        threshold: Option<f64>,
        min_silence: Option<f64>,
        trailing_scan: Option<TrailingScan>,
        output_dir: Option<PathBuf>,
    },
    Snr {
        path: PathBuf,
        asset_id: Option<String>,
        noise_threshold: Option<f64>,
        silent_segments: bool,
    },
    Batch {
        inputs: Vec<PathBuf>,
    },
    Features {
        asset_id: String,
    },
    /// Print effective settings; `save` writes them back to the settings file.
    Settings {
        save: bool,
    },
    Help,
}

pub fn parse_args<I>(args: I) -> Result<Cli, String>
where
    I: IntoIterator<Item = String>,
{
    let mut settings_path = None;
    let mut db_path = None;
    let mut command_name: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut asset_id = None;
    let mut threshold = None;
    let mut min_silence = None;
    let mut trailing_scan = None;
    let mut output_dir = None;
    let mut noise_threshold = None;
    let mut silent_segments = false;
    let mut save = false;

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => settings_path = Some(PathBuf::from(value(&mut it, "--settings")?)),
            "--db" => db_path = Some(PathBuf::from(value(&mut it, "--db")?)),
            "--asset-id" => asset_id = Some(value(&mut it, "--asset-id")?),
            "--threshold" => threshold = Some(fraction(&mut it, "--threshold")?),
            "--noise-threshold" => noise_threshold = Some(fraction(&mut it, "--noise-threshold")?),
            "--min-silence" => {
                let v = value(&mut it, "--min-silence")?;
                let secs = v
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s >= 0.0)
                    .ok_or_else(|| "invalid value for --min-silence".to_string())?;
                min_silence = Some(secs);
            }
            "--exact" => trailing_scan = Some(TrailingScan::Exact),
            "--early-exit" => trailing_scan = Some(TrailingScan::EarlyExit),
            "--output-dir" => output_dir = Some(PathBuf::from(value(&mut it, "--output-dir")?)),
            "--silent-segments" => silent_segments = true,
            "--save" => save = true,
            "--help" | "-h" => command_name = Some("help".into()),
            other if other.starts_with("--") => return Err(format!("unknown argument: {other}")),
            _ if command_name.is_none() => command_name = Some(arg.clone()),
            _ => positional.push(arg.clone()),
        }
    }

    let command = match command_name.as_deref() {
        None | Some("help") => Command::Help,
        Some("ingest") => Command::Ingest {
            path: single(positional, "ingest", "file")?.into(),
        },
        Some("trim") => Command::Trim {
            path: single(positional, "trim", "file")?.into(),
            asset_id,
            threshold,
            min_silence,
            trailing_scan,
            output_dir,
        },
        Some("snr") => Command::Snr {
            path: single(positional, "snr", "file")?.into(),
            asset_id,
            noise_threshold,
            silent_segments,
        },
        Some("batch") => {
            if positional.is_empty() {
                return Err("batch needs at least one file or directory".into());
            }
            Command::Batch {
                inputs: positional.into_iter().map(PathBuf::from).collect(),
            }
        }
        Some("features") => Command::Features {
            asset_id: single(positional, "features", "asset id")?,
        },
        Some("settings") => {
            if !positional.is_empty() {
                return Err("settings takes no arguments".into());
            }
            Command::Settings { save }
        }
        Some(other) => return Err(format!("unknown command: {other}")),
    };

    Ok(Cli {
        settings_path,
        db_path,
        command,
    })
}

fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    it.next().ok_or_else(|| format!("missing value for {flag}"))
}

fn fraction(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<f64, String> {
    value(it, flag)?
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
        .ok_or_else(|| format!("invalid value for {flag} (expected 0..1)"))
}

fn single(mut positional: Vec<String>, command: &str, what: &str) -> Result<String, String> {
    match positional.len() {
        1 => Ok(positional.remove(0)),
        0 => Err(format!("{command} needs a {what}")),
        _ => Err(format!("{command} takes exactly one {what}")),
    }
}
