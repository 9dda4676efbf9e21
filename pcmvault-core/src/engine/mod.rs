//! `AudioEngine`: file-level entry points over the pure algorithms.
//!
//! ## Operations
//!
//! ```text
//! ingest(path)        → AssetInfo      (hash + decode metadata)
//! trim_silence(path)  → TrimResult     (boundary search, encode, dedup)
//! compute_snr(path)   → SnrMeasurement (signal/noise power over full buffer)
//! ```
//!
//! ## Threading
//!
//! The engine only holds an immutable [`EngineConfig`]; every call is
//! synchronous and independent. Clone it freely into worker threads; callers
//! that need a timeout should run a call on a blocking task and discard any
//! partially written output on expiry.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    audio::wav,
    error::{CoreError, Result},
    ingest::ingest_raw_audio,
    records::AssetInfo,
    silence::SilenceParams,
    snr::{estimate_snr, SnrMeasurement, SnrParams},
    trim::{trim_file, TrimResult},
};

/// Default parameters applied when a call does not supply its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    /// Silence threshold, minimum silence and trailing scan mode.
    pub silence: SilenceParams,
    /// Noise threshold and noise population strategy.
    pub snr: SnrParams,
    /// Where trimmed files go. `None` writes next to each source file.
    pub output_dir: Option<PathBuf>,
}

/// Stateless audio engine handle.
#[derive(Debug, Clone, Default)]
pub struct AudioEngine {
    config: EngineConfig,
}

impl AudioEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Hash and describe a raw file, assigning it a new asset id.
    pub fn ingest(&self, path: &Path) -> Result<AssetInfo> {
        ingest_raw_audio(path)
    }

    /// Trim with the configured silence parameters.
    pub fn trim_silence(&self, path: &Path) -> Result<TrimResult> {
        self.trim_silence_with(path, &self.config.silence)
    }

    /// Trim with explicit silence parameters.
    pub fn trim_silence_with(&self, path: &Path, params: &SilenceParams) -> Result<TrimResult> {
        trim_file(path, self.config.output_dir.as_deref(), params)
    }

    /// SNR with the configured noise parameters.
    pub fn compute_snr(&self, path: &Path) -> Result<SnrMeasurement> {
        self.compute_snr_with(path, &self.config.snr)
    }

    /// SNR with explicit noise parameters.
    ///
    /// # Errors
    /// `CoreError::EmptyAudio` if the file decodes to zero samples, in addition
    /// to the decode errors of [`wav::read_wav`].
    pub fn compute_snr_with(&self, path: &Path, params: &SnrParams) -> Result<SnrMeasurement> {
        let buffer = wav::read_wav(path)?;
        if buffer.is_empty() {
            return Err(CoreError::EmptyAudio {
                path: path.to_path_buf(),
            });
        }

        let measurement = estimate_snr(
            &buffer.samples,
            buffer.channel_count(),
            params,
            buffer.scale(),
        );
        info!(
            path = %path.display(),
            snr_db = measurement.snr,
            signal_rms = measurement.signal_rms,
            noise_rms = measurement.noise_rms,
            "snr computed"
        );
        Ok(measurement)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::audio::SampleBuffer;
    use crate::snr::NoiseStrategy;

    #[test]
    fn empty_file_is_rejected_for_snr() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("empty.wav");
        wav::write_wav(&path, &SampleBuffer::pcm16(vec![], 8_000, 1)).expect("write");

        let err = AudioEngine::default().compute_snr(&path).expect_err("empty");
        assert!(matches!(err, CoreError::EmptyAudio { .. }), "got {err:?}");
    }

    #[test]
    fn configured_output_dir_is_used() {
        let src_dir = tempdir().expect("src dir");
        let out_dir = tempdir().expect("out dir");
        let path = src_dir.path().join("take.wav");
        let mut samples = vec![0; 300];
        samples.extend(vec![12_000; 300]);
        samples.extend(vec![0; 300]);
        wav::write_wav(&path, &SampleBuffer::pcm16(samples, 1_000, 1)).expect("write");

        let engine = AudioEngine::new(EngineConfig {
            output_dir: Some(out_dir.path().to_path_buf()),
            ..EngineConfig::default()
        });
        let result = engine.trim_silence(&path).expect("trim");
        let out = result.output_path.expect("output path");
        assert_eq!(out.parent(), Some(out_dir.path()));
    }

    #[test]
    fn explicit_snr_params_override_config() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("mix.wav");
        wav::write_wav(&path, &SampleBuffer::pcm16(vec![50, 9_000, 60, 70], 8_000, 2)).expect("write");

        let engine = AudioEngine::default();
        let per_sample = engine.compute_snr(&path).expect("default snr");
        let per_frame = engine
            .compute_snr_with(&path, &SnrParams::new(0.01, NoiseStrategy::SilentSegments))
            .expect("segment snr");
        assert_ne!(per_sample.noise_power, per_frame.noise_power);
    }
}
