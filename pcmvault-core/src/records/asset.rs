use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hashing::ContentHash;

/// Identifies the run that produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub workflow_id: String,
    pub workflow_run_id: String,
}

impl RunContext {
    pub fn new(workflow_id: impl Into<String>, workflow_run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            workflow_run_id: workflow_run_id.into(),
        }
    }
}

/// A content-addressed audio file.
///
/// Two assets with equal `content_hash` refer to byte-identical files.
/// `parent_asset_id` links a derived asset (e.g. a trimmed copy) to its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub workflow_id: String,
    pub workflow_run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_asset_id: Option<String>,
    pub file_path: PathBuf,
    pub content_hash: ContentHash,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// A source asset with no parent.
    pub fn root(
        id: impl Into<String>,
        run: &RunContext,
        file_path: impl Into<PathBuf>,
        content_hash: ContentHash,
    ) -> Self {
        Self {
            id: id.into(),
            workflow_id: run.workflow_id.clone(),
            workflow_run_id: run.workflow_run_id.clone(),
            parent_asset_id: None,
            file_path: file_path.into(),
            content_hash,
            created_at: Utc::now(),
        }
    }

    /// An asset derived from `parent_id`.
    pub fn derived(
        id: impl Into<String>,
        run: &RunContext,
        parent_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        content_hash: ContentHash,
    ) -> Self {
        Self {
            parent_asset_id: Some(parent_id.into()),
            ..Self::root(id, run, file_path, content_hash)
        }
    }
}

/// Basic stream properties reported at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// Frames per second.
    pub sample_rate: u32,
    /// Seconds: samples / (sample_rate × channels).
    pub duration: f64,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// Result of ingesting a raw file: a fresh identity plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub asset_id: String,
    pub file_path: PathBuf,
    pub content_hash: ContentHash,
    pub metadata: AudioMetadata,
}

impl AssetInfo {
    /// The root [`Asset`] record for this ingest.
    pub fn to_asset(&self, run: &RunContext) -> Asset {
        Asset::root(
            self.asset_id.clone(),
            run,
            self.file_path.clone(),
            self.content_hash.clone(),
        )
    }
}
