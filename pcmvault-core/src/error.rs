use std::path::PathBuf;

use thiserror::Error;

/// All errors produced by pcmvault-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot open input file {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid audio container: {0}")]
    Format(String),

    #[error("failed to encode trimmed audio: {0}")]
    Encode(String),

    #[error("audio file contains no samples: {path}")]
    EmptyAudio { path: PathBuf },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// Wrap an open/read failure on a caller-supplied path.
    pub fn input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
