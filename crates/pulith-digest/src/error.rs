use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed for {}: {source}", .path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stream read failed: {0}")]
    Stream(#[source] io::Error),

    #[error("output buffer holds {actual} bytes, digest needs {expected}")]
    OutputLength { expected: usize, actual: usize },

    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),
}

impl DigestError {
    /// Attach a path to a stream failure so it reads as a file read failure.
    pub(crate) fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            DigestError::Stream(source) => DigestError::Read {
                path: path.into(),
                source,
            },
            other => other,
        }
    }

    pub fn is_open(&self) -> bool { matches!(self, DigestError::Open { .. }) }

    pub fn is_read(&self) -> bool {
        matches!(self, DigestError::Read { .. } | DigestError::Stream(_))
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;
