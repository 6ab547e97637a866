use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ExportError {
    #[error("extraction failed for {input}: {reason}")]
    Extraction { input: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{failed} of {total} export job(s) failed")]
    PartialBatch { failed: usize, total: usize },
}

impl ExportError {
    pub(crate) fn extraction(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
