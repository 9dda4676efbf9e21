//! Leading/trailing silence detection over interleaved integer PCM.
//!
//! ## Algorithm
//!
//! 1. Convert the fractional threshold to an amplitude `T` on the buffer's
//!    [`AmplitudeScale`].
//! 2. A frame is silent iff every channel satisfies `|sample| ≤ T`.
//! 3. Start: the first non-silent frame scanning forward (`0` if the whole
//!    buffer is silent).
//! 4. End: scan backward from the last frame, never below the start.
//!    - [`TrailingScan::Exact`] stops at the last non-silent frame.
//!    - [`TrailingScan::EarlyExit`] also stops once `min_silence_frames`
//!      consecutive silent frames have been seen, leaving any silence beyond
//!      that point in place.
//!
//!    The end is one past the last frame examined.
//! 5. If the end does not lie after the start, the full range is returned,
//!    which callers read as "nothing to trim".

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::AmplitudeScale;

/// Silence threshold used when the caller passes `0` (1 % of peak).
pub const DEFAULT_SILENCE_THRESHOLD: f64 = 0.01;

/// Minimum trailing silence used when the caller passes `0` (100 ms).
pub const DEFAULT_MIN_SILENCE_SECS: f64 = 0.1;

/// How the backward scan decides where trailing silence ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrailingScan {
    /// Trim exactly to the last non-silent frame.
    #[default]
    Exact,
    /// Stop after `min_silence_frames` consecutive silent frames.
    EarlyExit,
}

/// Caller-supplied silence parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceParams {
    /// Fraction of peak amplitude in `[0, 1]`; `0` selects the default.
    pub threshold: f64,
    /// Seconds of silence the early-exit scan needs; `0` selects the default.
    pub min_silence_secs: f64,
    pub trailing_scan: TrailingScan,
}

impl SilenceParams {
    pub fn new(threshold: f64, min_silence_secs: f64) -> Self {
        Self {
            threshold,
            min_silence_secs,
            trailing_scan: TrailingScan::default(),
        }
    }

    pub fn with_trailing_scan(mut self, trailing_scan: TrailingScan) -> Self {
        self.trailing_scan = trailing_scan;
        self
    }

    /// Threshold with the zero/unset default applied.
    pub fn effective_threshold(&self) -> f64 {
        if self.threshold.is_finite() && self.threshold > 0.0 {
            self.threshold.min(1.0)
        } else {
            DEFAULT_SILENCE_THRESHOLD
        }
    }

    /// Minimum silence duration with the zero/unset default applied.
    pub fn effective_min_silence_secs(&self) -> f64 {
        if self.min_silence_secs.is_finite() && self.min_silence_secs > 0.0 {
            self.min_silence_secs
        } else {
            DEFAULT_MIN_SILENCE_SECS
        }
    }

    /// `round(sample_rate × min_silence_secs)`, at least one frame.
    pub fn min_silence_frames(&self, sample_rate: u32) -> usize {
        let frames = (f64::from(sample_rate) * self.effective_min_silence_secs()).round();
        (frames as usize).max(1)
    }
}

impl Default for SilenceParams {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD, DEFAULT_MIN_SILENCE_SECS)
    }
}

/// Half-open frame range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: usize,
    pub end: usize,
}

impl FrameRange {
    /// The whole buffer: `[0, frame_count)`.
    pub fn full(frame_count: usize) -> Self {
        Self {
            start: 0,
            end: frame_count,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the range covers every frame, i.e. nothing would be trimmed.
    pub fn is_full(&self, frame_count: usize) -> bool {
        *self == Self::full(frame_count)
    }

    pub fn frames(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Convert to interleaved sample offsets.
    pub fn to_sample_range(&self, channels: usize) -> Range<usize> {
        self.start * channels..self.end * channels
    }
}

/// A frame is silent when no channel exceeds `threshold` in magnitude.
pub fn frame_is_silent(frame: &[i32], threshold: u32) -> bool {
    frame.iter().all(|s| s.unsigned_abs() <= threshold)
}

/// Locate the non-silent region of an interleaved buffer, in frames.
///
/// An empty buffer (or `channels == 0`) yields `[0, 0)`, which is also its
/// full range.
pub fn find_non_silent_range(
    samples: &[i32],
    channels: usize,
    sample_rate: u32,
    params: &SilenceParams,
    scale: AmplitudeScale,
) -> FrameRange {
    if channels == 0 {
        return FrameRange::full(0);
    }
    let frame_count = samples.len() / channels;
    if frame_count == 0 {
        return FrameRange::full(0);
    }

    let threshold = scale.threshold(params.effective_threshold());
    let is_silent = |f: usize| frame_is_silent(&samples[f * channels..(f + 1) * channels], threshold);

    let start = (0..frame_count).find(|&f| !is_silent(f)).unwrap_or(0);

    let min_silence_frames = params.min_silence_frames(sample_rate);
    let mut end = frame_count;
    let mut silent_run = 0usize;
    for f in (start..frame_count).rev() {
        if !is_silent(f) {
            end = f + 1;
            break;
        }
        silent_run += 1;
        if params.trailing_scan == TrailingScan::EarlyExit && silent_run >= min_silence_frames {
            end = f + 1;
            break;
        }
    }

    let range = resolve_range(start, end, frame_count);
    debug!(
        threshold,
        min_silence_frames,
        frame_count,
        start = range.start,
        end = range.end,
        scan = ?params.trailing_scan,
        "silence boundaries"
    );
    range
}

/// Apply the degeneracy guard: a non-positive span collapses to the full range.
fn resolve_range(start: usize, end: usize, frame_count: usize) -> FrameRange {
    if end <= start {
        FrameRange::full(frame_count)
    } else {
        FrameRange { start, end }
    }
}
