//! Content addressing: SHA-256 over raw file bytes, rendered as lowercase hex.
//!
//! Every stored `content_hash` is compared against digests produced here, so
//! the algorithm is part of the persisted contract. Changing it requires a
//! new [`HASH_ALGORITHM`] tag and a migration of existing records.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Tag of the digest algorithm behind every [`ContentHash`].
pub const HASH_ALGORITHM: &str = "sha256";

/// Hex-encoded SHA-256 digest identifying byte-identical content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a previously computed hex digest (e.g. loaded from storage).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 hex characters; used for content-derived file names.
    ///
    /// Falls back to the whole value when byte 16 is not a char boundary,
    /// which only happens for non-hex input.
    pub fn short(&self) -> &str {
        self.0.get(..16).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest an entire stream.
///
/// # Errors
/// `CoreError::Io` if the stream cannot be read to the end.
pub fn hash_reader<R: Read>(mut reader: R) -> Result<ContentHash> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Digest an in-memory byte slice.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    ContentHash(format!("{:x}", Sha256::digest(bytes)))
}

/// Digest the file at `path`.
///
/// # Errors
/// `CoreError::Input` if the file cannot be opened, `CoreError::Io` on read failure.
pub fn hash_file(path: &Path) -> Result<ContentHash> {
    let file = File::open(path).map_err(|e| CoreError::input(path, e))?;
    hash_reader(BufReader::new(file))
}
