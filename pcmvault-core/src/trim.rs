//! Silence trimming with content-addressed deduplication.
//!
//! ## Flow
//!
//! ```text
//! source bytes ──► sha256 (original hash)
//!      │
//!      └─► decode ─► find_non_silent_range
//!                        │
//!             full range ┼─► no-op (original hash, nothing written)
//!                        │
//!                        └─► slice ─► encode to .trim-<rand>.partial ─► sha256
//!                                          │
//!                          same as original ┼─► delete, no-op
//!                                          │
//!                                          └─► rename to trimmed_<hash16>.wav,
//!                                              allocate new asset id
//! ```
//!
//! The final file name is derived from the trimmed content's hash, so
//! concurrent trims of different sources never race on a path.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audio::{wav, SampleBuffer};
use crate::error::{CoreError, Result};
use crate::hashing::{hash_bytes, hash_file, ContentHash};
use crate::records::new_id;
use crate::silence::{find_non_silent_range, FrameRange, SilenceParams};

/// Outcome of one trim attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimResult {
    /// Present iff `was_trimmed && !no_op`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_asset_id: Option<String>,
    /// Hash of the resulting content: the original's on a no-op.
    pub content_hash: ContentHash,
    pub was_trimmed: bool,
    /// True when the result is byte-identical to the source.
    pub no_op: bool,
    /// Present iff a new file was materialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl TrimResult {
    /// The source is already trimmed; nothing was written.
    pub fn unchanged(original_hash: ContentHash) -> Self {
        Self {
            new_asset_id: None,
            content_hash: original_hash,
            was_trimmed: false,
            no_op: true,
            output_path: None,
        }
    }
}

/// File name of a trimmed output: `trimmed_<first 16 hex chars>.wav`.
pub fn trimmed_file_name(hash: &ContentHash) -> String {
    format!("trimmed_{}.wav", hash.short())
}

/// Trim leading/trailing silence from the WAV file at `source`.
///
/// The output goes to `output_dir`, or next to the source when `None`.
///
/// # Errors
/// `CoreError::Input` if the source cannot be read, `CoreError::Format` if it
/// is not integer-PCM WAV, `CoreError::Encode`/`CoreError::Io` while writing.
pub fn trim_file(source: &Path, output_dir: Option<&Path>, params: &SilenceParams) -> Result<TrimResult> {
    let bytes = fs::read(source).map_err(|e| CoreError::input(source, e))?;
    let original_hash = hash_bytes(&bytes);
    let buffer = wav::decode(Cursor::new(bytes.as_slice()))?;

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    info!(source = %source.display(), hash = %original_hash, "trimming silence");
    trim_buffer(&buffer, &original_hash, &dir, params)
}

/// Trim an already-decoded buffer whose source bytes hash to `original_hash`.
pub fn trim_buffer(
    buffer: &SampleBuffer,
    original_hash: &ContentHash,
    output_dir: &Path,
    params: &SilenceParams,
) -> Result<TrimResult> {
    buffer.validate()?;

    let frame_count = buffer.frame_count();
    let range = find_non_silent_range(
        &buffer.samples,
        buffer.channel_count(),
        buffer.sample_rate,
        params,
        buffer.scale(),
    );

    if range.is_full(frame_count) {
        debug!(frame_count, "no leading/trailing silence; no-op");
        return Ok(TrimResult::unchanged(original_hash.clone()));
    }

    let trimmed = buffer.slice_frames(range.frames());
    let staged = StagedFile::create_in(output_dir)?;
    wav::write_wav(staged.path(), &trimmed)?;
    let new_hash = hash_file(staged.path())?;

    if &new_hash == original_hash {
        warn!(hash = %new_hash, "re-encoded output is byte-identical to the source; discarding");
        return Ok(TrimResult::unchanged(original_hash.clone()));
    }

    let output_path = output_dir.join(trimmed_file_name(&new_hash));
    staged.persist(&output_path)?;

    let removed = frame_count - range.len();
    info!(
        start_frame = range.start,
        end_frame = range.end,
        removed_frames = removed,
        hash = %new_hash,
        output = %output_path.display(),
        "trimmed asset written"
    );

    Ok(TrimResult {
        new_asset_id: Some(new_id("asset")),
        content_hash: new_hash,
        was_trimmed: true,
        no_op: false,
        output_path: Some(output_path),
    })
}

/// Frames kept by a trim of `buffer`, without writing anything.
pub fn plan_trim(buffer: &SampleBuffer, params: &SilenceParams) -> FrameRange {
    find_non_silent_range(
        &buffer.samples,
        buffer.channel_count(),
        buffer.sample_rate,
        params,
        buffer.scale(),
    )
}

/// A uniquely named scratch file, removed on drop unless persisted.
struct StagedFile {
    path: PathBuf,
    keep: bool,
}

impl StagedFile {
    fn create_in(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!(".trim-{:016x}.partial", rand::random::<u64>()));
        Ok(Self { path, keep: false })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Move into place under `dest`, replacing an identical earlier output.
    fn persist(mut self, dest: &Path) -> Result<()> {
        fs::rename(&self.path, dest)?;
        self.keep = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "failed to remove staged file: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::tempdir;

    use super::*;
    use crate::silence::TrailingScan;

    fn encoded(buffer: &SampleBuffer) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        wav::encode(&mut cursor, buffer).expect("encode");
        cursor.into_inner()
    }

    fn padded(lead: usize, body: usize, tail: usize) -> SampleBuffer {
        let mut samples = vec![0; lead];
        samples.extend(std::iter::repeat(20_000).take(body));
        samples.extend(std::iter::repeat(0).take(tail));
        SampleBuffer::pcm16(samples, 1_000, 1)
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn full_range_is_a_no_op_and_writes_nothing() {
        let dir = tempdir().expect("temp dir");
        let buffer = SampleBuffer::pcm16(vec![9_000; 500], 1_000, 1);
        let hash = hash_bytes(&encoded(&buffer));

        let result = trim_buffer(&buffer, &hash, dir.path(), &SilenceParams::default()).expect("trim");
        assert_eq!(result, TrimResult::unchanged(hash));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn trimmed_output_is_content_addressed() {
        let dir = tempdir().expect("temp dir");
        let buffer = padded(1_000, 2_000, 1_000);
        let hash = hash_bytes(&encoded(&buffer));

        let result = trim_buffer(&buffer, &hash, dir.path(), &SilenceParams::default()).expect("trim");
        assert!(result.was_trimmed);
        assert!(!result.no_op);
        assert_ne!(result.content_hash, hash);
        assert!(result.new_asset_id.as_deref().is_some_and(|id| id.starts_with("asset-")));

        let out = result.output_path.clone().expect("output path");
        assert_eq!(
            out.file_name().and_then(|n| n.to_str()),
            Some(trimmed_file_name(&result.content_hash).as_str())
        );
        assert_eq!(hash_file(&out).expect("hash output"), result.content_hash);

        let written = wav::read_wav(&out).expect("decode output");
        assert_eq!(written.frame_count(), 2_000);
        assert!(written.samples.iter().all(|&s| s == 20_000));
        // Only the final file remains; the staged file was renamed away.
        assert_eq!(dir_entries(dir.path()).len(), 1);
    }

    #[test]
    fn identical_reencode_is_discarded() {
        let dir = tempdir().expect("temp dir");
        let buffer = padded(10, 100, 10);
        let params = SilenceParams::default();
        let range = plan_trim(&buffer, &params);
        // Pretend the source already was the trimmed encoding.
        let trimmed_hash = hash_bytes(&encoded(&buffer.slice_frames(range.frames())));

        let result = trim_buffer(&buffer, &trimmed_hash, dir.path(), &params).expect("trim");
        assert!(result.no_op);
        assert!(!result.was_trimmed);
        assert!(result.output_path.is_none());
        assert!(result.new_asset_id.is_none());
        assert_eq!(result.content_hash, trimmed_hash);
        assert!(dir_entries(dir.path()).is_empty(), "staged file must be removed");
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let dir = tempdir().expect("temp dir");
        let buffer = SampleBuffer::pcm16(vec![], 1_000, 2);
        let hash = hash_bytes(b"empty");
        let result = trim_buffer(&buffer, &hash, dir.path(), &SilenceParams::default()).expect("trim");
        assert!(result.no_op);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn early_exit_keeps_more_tail() {
        let buffer = padded(1_000, 2_000, 1_000);
        let exact = plan_trim(&buffer, &SilenceParams::default());
        let early = plan_trim(
            &buffer,
            &SilenceParams::default().with_trailing_scan(TrailingScan::EarlyExit),
        );
        assert_eq!(exact.end, 3_000);
        assert_eq!(early.end, 3_901);
    }

    #[test]
    fn trim_file_reads_and_writes_next_to_source() {
        let dir = tempdir().expect("temp dir");
        let source = dir.path().join("take.wav");
        let buffer = padded(200, 300, 200);
        wav::write_wav(&source, &buffer).expect("write source");

        let result = trim_file(&source, None, &SilenceParams::default()).expect("trim file");
        let out = result.output_path.expect("output");
        assert_eq!(out.parent(), Some(dir.path()));
        assert_eq!(wav::read_wav(&out).expect("decode").frame_count(), 300);
    }

    #[test]
    fn trim_file_rejects_non_wav() {
        let dir = tempdir().expect("temp dir");
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"not audio").expect("write");
        let err = trim_file(&source, None, &SilenceParams::default()).expect_err("format error");
        assert!(matches!(err, CoreError::Format(_)), "got {err:?}");
    }

    #[test]
    fn staged_file_is_removed_on_drop() {
        let dir = tempdir().expect("temp dir");
        let path = {
            let staged = StagedFile::create_in(dir.path()).expect("stage");
            fs::write(staged.path(), b"partial").expect("write");
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
