//! # pcmvault-core
//!
//! Content-addressed PCM audio engine: silence trimming with deduplication
//! and signal-to-noise estimation.
//!
//! ## Architecture
//!
//! ```text
//! WAV file ─► hashing::hash_bytes ───────────────────────────┐
//!    │                                                       │ compare
//!    └─► audio::wav::decode ─► silence::find_non_silent_range │
//!                 │                     │                     │
//!                 │               trim::trim_buffer ─► encode ─► hash ─► TrimResult
//!                 │
//!                 └─► snr::estimate_snr ─► SnrMeasurement ─► records::Feature
//! ```
//!
//! Every operation is synchronous and holds no shared state; `AudioEngine`
//! is a thin façade carrying default parameters.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod ingest;
pub mod records;
pub mod silence;
pub mod snr;
pub mod trim;

// Convenience re-exports for downstream crates
pub use audio::{AmplitudeScale, SampleBuffer};
pub use engine::{AudioEngine, EngineConfig};
pub use error::CoreError;
pub use hashing::{ContentHash, HASH_ALGORITHM};
pub use records::{Asset, AssetInfo, AudioMetadata, Feature, FeatureData, RunContext};
pub use silence::{FrameRange, SilenceParams, TrailingScan};
pub use snr::{NoiseStrategy, SnrMeasurement, SnrParams};
pub use trim::TrimResult;
