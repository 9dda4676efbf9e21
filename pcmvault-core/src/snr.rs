//! Signal-to-noise ratio estimation over integer PCM.
//!
//! ## Algorithm
//!
//! 1. Signal power is the mean square of *every* sample (not per frame).
//! 2. The noise population is chosen by [`NoiseStrategy`]:
//!    - `Samples`: each sample with `|s| ≤ T`, regardless of its neighbours.
//!    - `SilentSegments`: every sample of each frame that is silent under the
//!      same all-channels rule the silence trimmer uses.
//! 3. Noise power is the mean square of that population. An empty population
//!    gets a fixed one-LSB floor of `1.0` for both power and RMS.
//! 4. `snr = 10·log10(signal / noise)`; a silent signal reports `0 dB` and a
//!    population of exact zeros reports the [`SNR_CEILING_DB`] cap.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::AmplitudeScale;
use crate::silence::frame_is_silent;

/// Noise threshold used when the caller passes `0` (1 % of peak).
pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.01;

/// Noise power/RMS reported when no sample qualifies as noise.
pub const NOISE_FLOOR: f64 = 1.0;

/// SNR reported when the signal is non-zero but the noise power is exactly zero.
pub const SNR_CEILING_DB: f64 = 120.0;

/// Which samples count towards the noise estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseStrategy {
    /// Individual samples at or below the threshold.
    #[default]
    Samples,
    /// All samples of frames whose every channel is at or below the threshold.
    SilentSegments,
}

impl NoiseStrategy {
    pub fn from_silent_segments(use_silent_segments: bool) -> Self {
        if use_silent_segments {
            Self::SilentSegments
        } else {
            Self::Samples
        }
    }

    pub fn uses_silent_segments(self) -> bool {
        self == Self::SilentSegments
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnrParams {
    /// Fraction of peak amplitude in `[0, 1]`; `0` selects the default.
    pub noise_threshold: f64,
    pub strategy: NoiseStrategy,
}

impl SnrParams {
    pub fn new(noise_threshold: f64, strategy: NoiseStrategy) -> Self {
        Self {
            noise_threshold,
            strategy,
        }
    }

    /// Threshold with the zero/unset default applied.
    pub fn effective_noise_threshold(&self) -> f64 {
        if self.noise_threshold.is_finite() && self.noise_threshold > 0.0 {
            self.noise_threshold.min(1.0)
        } else {
            DEFAULT_NOISE_THRESHOLD
        }
    }
}

impl Default for SnrParams {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_THRESHOLD, NoiseStrategy::default())
    }
}

/// Result of one SNR estimation. Field names match the persisted feature document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SnrMeasurement {
    /// Signal-to-noise ratio in dB.
    pub snr: f64,
    pub signal_power: f64,
    pub noise_power: f64,
    pub signal_rms: f64,
    pub noise_rms: f64,
}

/// Running mean-square accumulator.
#[derive(Debug, Default, Clone, Copy)]
struct PowerAccumulator {
    sum_sq: f64,
    count: usize,
}

impl PowerAccumulator {
    fn push(&mut self, sample: i32) {
        let s = f64::from(sample);
        self.sum_sq += s * s;
        self.count += 1;
    }

    fn extend<'a>(&mut self, samples: impl IntoIterator<Item = &'a i32>) {
        for &s in samples {
            self.push(s);
        }
    }

    /// Mean square, or `None` when nothing was accumulated.
    fn power(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_sq / self.count as f64)
    }
}

fn rms(power: f64) -> f64 {
    if power > 0.0 {
        power.sqrt()
    } else {
        0.0
    }
}

/// Estimate SNR for an interleaved buffer.
///
/// An empty buffer yields an all-zero measurement; callers that need a
/// meaningful SNR must reject empty input themselves.
pub fn estimate_snr(
    samples: &[i32],
    channels: usize,
    params: &SnrParams,
    scale: AmplitudeScale,
) -> SnrMeasurement {
    if samples.is_empty() {
        return SnrMeasurement::default();
    }

    let mut signal = PowerAccumulator::default();
    signal.extend(samples);
    let signal_power = signal.power().unwrap_or(0.0);

    let threshold = scale.threshold(params.effective_noise_threshold());
    let mut noise = PowerAccumulator::default();
    match params.strategy {
        NoiseStrategy::Samples => {
            noise.extend(samples.iter().filter(|s| s.unsigned_abs() <= threshold));
        }
        NoiseStrategy::SilentSegments => {
            for frame in samples.chunks(channels.max(1)) {
                if frame_is_silent(frame, threshold) {
                    noise.extend(frame);
                }
            }
        }
    }

    let (noise_power, noise_rms) = match noise.power() {
        Some(power) => (power, rms(power)),
        None => (NOISE_FLOOR, NOISE_FLOOR),
    };

    let snr = if signal_power > 0.0 && noise_power > 0.0 {
        10.0 * (signal_power / noise_power).log10()
    } else if signal_power > 0.0 {
        SNR_CEILING_DB
    } else {
        0.0
    };

    debug!(
        threshold,
        strategy = ?params.strategy,
        noise_samples = noise.count,
        signal_power,
        noise_power,
        snr,
        "snr estimated"
    );

    SnrMeasurement {
        snr,
        signal_power,
        noise_power,
        signal_rms: rms(signal_power),
        noise_rms,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn estimate(samples: &[i32], channels: usize, params: SnrParams) -> SnrMeasurement {
        estimate_snr(samples, channels, &params, AmplitudeScale::PCM16)
    }

    /// Sine with a DC-free amplitude that never gets near zero: every sample
    /// magnitude is at least `floor`.
    fn offset_sine(len: usize, amplitude: f64, floor: i32) -> Vec<i32> {
        (0..len)
            .map(|i| {
                let v = (i as f64 * 0.05).sin() * amplitude;
                let mag = v.abs().round() as i32 + floor;
                if v < 0.0 {
                    -mag
                } else {
                    mag
                }
            })
            .collect()
    }

    #[test]
    fn empty_buffer_is_all_zero() {
        assert_eq!(estimate(&[], 1, SnrParams::default()), SnrMeasurement::default());
    }

    #[test]
    fn zero_signal_reports_zero_db() {
        let m = estimate(&[0; 64], 1, SnrParams::default());
        assert_eq!(m.snr, 0.0);
        assert_eq!(m.signal_power, 0.0);
        assert_eq!(m.signal_rms, 0.0);
        // Every zero sample is noise, so no floor here.
        assert_eq!(m.noise_power, 0.0);
        assert_eq!(m.noise_rms, 0.0);
    }

    #[test]
    fn loud_signal_without_noise_uses_floor() {
        let samples = offset_sine(4_000, 10_000.0, 1_000);
        let m = estimate(&samples, 1, SnrParams::default());
        assert_eq!(m.noise_power, NOISE_FLOOR);
        assert_eq!(m.noise_rms, NOISE_FLOOR);
        assert_relative_eq!(m.snr, 10.0 * m.signal_power.log10(), epsilon = 1e-9);
        assert!(m.snr.is_finite());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let samples = offset_sine(10_000, 12_000.0, 500);
        let a = estimate(&samples, 2, SnrParams::default());
        let b = estimate(&samples, 2, SnrParams::default());
        assert_eq!(a, b);
    }

    #[test]
    fn square_wave_powers() {
        // ±1000 signal with ±100 noise samples interleaved.
        let samples: Vec<i32> = (0..400)
            .map(|i| match i % 4 {
                0 => 1_000,
                1 => -1_000,
                2 => 100,
                _ => -100,
            })
            .collect();
        let m = estimate(&samples, 1, SnrParams::default());
        assert_relative_eq!(m.signal_power, (1_000_000.0 + 10_000.0) / 2.0);
        assert_relative_eq!(m.noise_power, 10_000.0);
        assert_relative_eq!(m.noise_rms, 100.0);
        assert_relative_eq!(m.snr, 10.0 * (505_000.0f64 / 10_000.0).log10(), epsilon = 1e-9);
    }

    #[test]
    fn exact_zero_noise_hits_ceiling() {
        let samples: Vec<i32> = (0..100).map(|i| if i % 2 == 0 { 0 } else { 8_000 }).collect();
        let m = estimate(&samples, 1, SnrParams::default());
        assert_eq!(m.noise_power, 0.0);
        assert_eq!(m.snr, SNR_CEILING_DB);
    }

    #[test]
    fn strategies_differ_on_mixed_frames() {
        // Stereo frames: (quiet, loud) then (quiet, quiet).
        let samples = vec![50, 9_000, 60, 70];
        let per_sample = estimate(&samples, 2, SnrParams::new(0.01, NoiseStrategy::Samples));
        let per_frame = estimate(&samples, 2, SnrParams::new(0.01, NoiseStrategy::SilentSegments));

        // Samples: 50, 60, 70 are noise.
        assert_relative_eq!(per_sample.noise_power, (2_500.0 + 3_600.0 + 4_900.0) / 3.0);
        // SilentSegments: only the second frame (60, 70) is silent.
        assert_relative_eq!(per_frame.noise_power, (3_600.0 + 4_900.0) / 2.0);
        assert_eq!(per_sample.signal_power, per_frame.signal_power);
    }

    #[test]
    fn silent_segments_without_silent_frames_use_floor() {
        let samples = vec![0, 9_000, 0, 9_000];
        let m = estimate(&samples, 2, SnrParams::new(0.01, NoiseStrategy::SilentSegments));
        assert_eq!(m.noise_power, NOISE_FLOOR);
        assert_eq!(m.noise_rms, NOISE_FLOOR);
    }

    #[test]
    fn zero_threshold_falls_back_to_default() {
        let params = SnrParams::new(0.0, NoiseStrategy::Samples);
        assert_eq!(params.effective_noise_threshold(), DEFAULT_NOISE_THRESHOLD);
    }

    #[test]
    fn strategy_bool_mapping() {
        assert!(NoiseStrategy::from_silent_segments(true).uses_silent_segments());
        assert!(!NoiseStrategy::from_silent_segments(false).uses_silent_segments());
    }
}
