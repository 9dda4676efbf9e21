//! WAV container adapter built on `hound`.
//!
//! Decoding yields an integer [`SampleBuffer`] at the file's native depth;
//! encoding writes one back with the same rate, channel count and depth, so a
//! trimmed file lives in the same container/encoding as its source.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use tracing::debug;

use super::SampleBuffer;
use crate::error::{CoreError, Result};

/// Decode an integer-PCM WAV stream.
///
/// # Errors
/// - `CoreError::Format` if the stream is not a valid WAV file or holds
///   floating-point samples.
/// - `CoreError::Io` on read failures inside the sample data.
pub fn decode<R: Read>(reader: R) -> Result<SampleBuffer> {
    let mut reader = hound::WavReader::new(reader).map_err(decode_error)?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int {
        return Err(CoreError::Format(
            "floating-point WAV is not integer PCM".into(),
        ));
    }
    if spec.channels == 0 {
        return Err(CoreError::Format("WAV header declares zero channels".into()));
    }

    let samples = reader
        .samples::<i32>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(decode_error)?;

    debug!(
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits_per_sample = spec.bits_per_sample,
        samples = samples.len(),
        "decoded WAV"
    );

    Ok(SampleBuffer::new(
        samples,
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
    ))
}

/// Open and decode a WAV file.
///
/// # Errors
/// `CoreError::Input` if the file cannot be opened, otherwise as [`decode`].
pub fn read_wav(path: &Path) -> Result<SampleBuffer> {
    let file = File::open(path).map_err(|e| CoreError::input(path, e))?;
    decode(BufReader::new(file))
}

/// Encode `buffer` as integer-PCM WAV into a seekable writer.
///
/// # Errors
/// `CoreError::Encode` if the layout is unusable or a sample does not fit the
/// declared bit depth; `CoreError::Io` on write failures.
pub fn encode<W: Write + Seek>(writer: W, buffer: &SampleBuffer) -> Result<()> {
    buffer
        .validate()
        .map_err(|e| CoreError::Encode(e.to_string()))?;

    let spec = hound::WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: buffer.bits_per_sample,
        sample_format: hound::SampleFormat::Int,
    };

    let mut wav = hound::WavWriter::new(writer, spec).map_err(encode_error)?;
    for &sample in &buffer.samples {
        wav.write_sample(sample).map_err(encode_error)?;
    }
    wav.finalize().map_err(encode_error)
}

/// Create (or truncate) `path` and encode `buffer` into it.
pub fn write_wav(path: &Path, buffer: &SampleBuffer) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    encode(&mut out, buffer)?;
    out.flush()?;
    Ok(())
}

fn decode_error(err: hound::Error) -> CoreError {
    match err {
        hound::Error::IoError(e) => CoreError::Io(e),
        other => CoreError::Format(other.to_string()),
    }
}

fn encode_error(err: hound::Error) -> CoreError {
    match err {
        hound::Error::IoError(e) => CoreError::Io(e),
        other => CoreError::Encode(other.to_string()),
    }
}
