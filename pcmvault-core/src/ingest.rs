//! Raw-file ingest: content hash, decode, metadata, fresh asset id.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use tracing::info;

use crate::audio::wav;
use crate::error::{CoreError, Result};
use crate::hashing::hash_bytes;
use crate::records::{new_id, AssetInfo, AudioMetadata};

/// Ingest the WAV file at `path`.
///
/// The file is read once; the hash covers the exact bytes on disk and the
/// metadata comes from decoding those same bytes.
///
/// # Errors
/// `CoreError::Input` if the file cannot be read, `CoreError::Format` if it is
/// not integer-PCM WAV.
pub fn ingest_raw_audio(path: &Path) -> Result<AssetInfo> {
    let bytes = fs::read(path).map_err(|e| CoreError::input(path, e))?;
    let content_hash = hash_bytes(&bytes);
    let buffer = wav::decode(Cursor::new(bytes.as_slice()))?;

    let metadata = AudioMetadata {
        sample_rate: buffer.sample_rate,
        duration: buffer.duration_secs(),
        channels: buffer.channels,
        bits_per_sample: buffer.bits_per_sample,
    };

    let info = AssetInfo {
        asset_id: new_id("asset"),
        file_path: path.to_path_buf(),
        content_hash,
        metadata,
    };

    info!(
        asset_id = %info.asset_id,
        hash = %info.content_hash,
        sample_rate = metadata.sample_rate,
        channels = metadata.channels,
        duration = metadata.duration,
        "ingested raw audio"
    );
    Ok(info)
}
