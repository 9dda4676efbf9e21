//! Persistent application settings (JSON file in the app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use pcmvault_core::silence::{DEFAULT_MIN_SILENCE_SECS, DEFAULT_SILENCE_THRESHOLD};
use pcmvault_core::snr::DEFAULT_NOISE_THRESHOLD;
use pcmvault_core::{EngineConfig, NoiseStrategy, SilenceParams, SnrParams, TrailingScan};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// SQLite database; `None` uses the platform default.
    pub database_path: Option<PathBuf>,
    /// Trimmed output directory; `None` writes next to each source.
    pub output_dir: Option<PathBuf>,
    pub silence_threshold: f64,
    pub min_silence_duration: f64,
    pub trailing_scan: TrailingScan,
    pub noise_threshold: f64,
    pub use_silent_segments: bool,
    /// Concurrent files in `batch`.
    pub batch_workers: usize,
    /// Recorded on every asset as `workflow_id`.
    pub workflow_id: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            output_dir: None,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            min_silence_duration: DEFAULT_MIN_SILENCE_SECS,
            trailing_scan: TrailingScan::Exact,
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            use_silent_segments: false,
            batch_workers: 4,
            workflow_id: "pcmvault-cli".into(),
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.silence_threshold = clamp_fraction(self.silence_threshold, DEFAULT_SILENCE_THRESHOLD);
        self.noise_threshold = clamp_fraction(self.noise_threshold, DEFAULT_NOISE_THRESHOLD);
        self.min_silence_duration = if self.min_silence_duration.is_finite() {
            self.min_silence_duration.clamp(0.0, 60.0)
        } else {
            DEFAULT_MIN_SILENCE_SECS
        };
        self.batch_workers = self.batch_workers.clamp(1, 64);
        self.workflow_id = normalize_workflow_id(&self.workflow_id);
        self.output_dir = self.output_dir.take().filter(|p| !p.as_os_str().is_empty());
        self.database_path = self.database_path.take().filter(|p| !p.as_os_str().is_empty());
    }

    pub fn silence_params(&self) -> SilenceParams {
        SilenceParams::new(self.silence_threshold, self.min_silence_duration)
            .with_trailing_scan(self.trailing_scan)
    }

    pub fn snr_params(&self) -> SnrParams {
        SnrParams::new(
            self.noise_threshold,
            NoiseStrategy::from_silent_segments(self.use_silent_segments),
        )
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            silence: self.silence_params(),
            snr: self.snr_params(),
            output_dir: self.output_dir.clone(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| app_data_dir().join("pcmvault.db"))
    }
}

fn clamp_fraction(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

pub fn normalize_workflow_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "pcmvault-cli".into()
    } else {
        trimmed.into()
    }
}

fn app_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pcmvault")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("pcmvault")
    }
}

pub fn default_settings_path() -> PathBuf {
    app_data_dir().join("settings.json")
}

/// Load settings, falling back to defaults when the file is missing or invalid.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| match serde_json::from_str::<AppSettings>(&raw) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable settings: {e}");
                None
            }
        })
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
