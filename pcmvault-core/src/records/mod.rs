//! Identity and feature records exchanged with storage.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` with snake_case
//! field names, matching the documents the persistence layer writes.

pub mod asset;
pub mod feature;

pub use asset::{Asset, AssetInfo, AudioMetadata, RunContext};
pub use feature::{Feature, FeatureData, SnrComputationParams};

use chrono::Utc;

/// Generate an opaque, practically unique identifier such as
/// `asset-1718000000000000-9f3a12bc`.
pub fn new_id(prefix: &str) -> String {
    format!(
        "{prefix}-{}-{:08x}",
        Utc::now().timestamp_micros(),
        rand::random::<u32>()
    )
}
