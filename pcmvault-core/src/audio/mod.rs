//! Decoded PCM sample buffers and the amplitude scale used for thresholding.
//!
//! ## Layout
//!
//! Samples are channel-interleaved integers: `samples[frame * channels + ch]`.
//! A *frame* is one sample per channel at a single time index and is the unit
//! every boundary search works in.
//!
//! ## Amplitude scale
//!
//! Threshold fractions (e.g. `0.01`) are turned into integer amplitudes by
//! multiplying with the peak of the buffer's bit depth, `2^(bits-1) - 1`.
//! `AmplitudeScale::PCM16` (peak 32767) is the reference scale.

pub mod wav;

use std::ops::Range;

use crate::error::{CoreError, Result};

/// Peak-amplitude scale derived from a PCM bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmplitudeScale {
    peak: u32,
}

impl AmplitudeScale {
    /// 16-bit signed PCM: peak amplitude 32767.
    pub const PCM16: Self = Self {
        peak: i16::MAX as u32,
    };

    /// Scale for `bits_per_sample`-bit signed PCM.
    ///
    /// `0` falls back to the 16-bit scale; other depths are clamped to `2..=32`.
    pub fn from_bits_per_sample(bits: u16) -> Self {
        if bits == 0 {
            return Self::PCM16;
        }
        let bits = u32::from(bits.clamp(2, 32));
        let peak = (1_u64 << (bits - 1)) - 1;
        Self { peak: peak as u32 }
    }

    /// Largest positive sample value representable at this depth.
    pub fn peak(self) -> u32 {
        self.peak
    }

    /// Convert a fractional threshold in `[0, 1]` to an integer amplitude.
    ///
    /// The product is truncated toward zero: `0.01 × 32767 → 327`.
    pub fn threshold(self, fraction: f64) -> u32 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (fraction * f64::from(self.peak)) as u32
    }
}

impl Default for AmplitudeScale {
    fn default() -> Self {
        Self::PCM16
    }
}

/// An interleaved integer PCM buffer at a known rate and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    /// Channel-interleaved samples.
    pub samples: Vec<i32>,
    /// Frames per second (Hz).
    pub sample_rate: u32,
    /// Samples per frame.
    pub channels: u16,
    /// Bit depth of the source container (e.g. 16, 24).
    pub bits_per_sample: u16,
}

impl SampleBuffer {
    pub fn new(samples: Vec<i32>, sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Convenience constructor for 16-bit PCM.
    pub fn pcm16(samples: Vec<i32>, sample_rate: u32, channels: u16) -> Self {
        Self::new(samples, sample_rate, channels, 16)
    }

    /// Reject layouts no algorithm can work with.
    ///
    /// # Errors
    /// `CoreError::InvalidParameter` when `channels` or `sample_rate` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(CoreError::InvalidParameter("channel count must be > 0".into()));
        }
        if self.sample_rate == 0 {
            return Err(CoreError::InvalidParameter("sample rate must be > 0".into()));
        }
        Ok(())
    }

    /// Channel count as a slice stride.
    pub fn channel_count(&self) -> usize {
        usize::from(self.channels)
    }

    /// Number of complete frames. A trailing partial frame is not counted.
    pub fn frame_count(&self) -> usize {
        match self.channel_count() {
            0 => 0,
            ch => self.samples.len() / ch,
        }
    }

    /// Duration in seconds: samples / (rate × channels).
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 || self.samples.is_empty() {
            return 0.0;
        }
        self.samples.len() as f64 / (f64::from(self.sample_rate) * f64::from(self.channels))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Amplitude scale for this buffer's bit depth.
    pub fn scale(&self) -> AmplitudeScale {
        AmplitudeScale::from_bits_per_sample(self.bits_per_sample)
    }

    /// Copy out the frames in `frames`, keeping rate, layout and depth.
    pub fn slice_frames(&self, frames: Range<usize>) -> SampleBuffer {
        let ch = self.channel_count();
        let end = (frames.end * ch).min(self.samples.len());
        let start = (frames.start * ch).min(end);
        SampleBuffer {
            samples: self.samples[start..end].to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
        }
    }
}
