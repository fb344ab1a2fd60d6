//! Codec error types.

use std::path::{Path, PathBuf};

/// Errors that can occur while reading or writing save files.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An operating-system I/O call failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was readable but its contents do not follow the layout.
    #[error("malformed {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// The data to be written does not fit the layout's fixed-width fields.
    #[error("cannot encode {what}: {value} exceeds the format limit")]
    TooLarge { what: &'static str, value: u64 },
}

impl CodecError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> CodecError + '_ {
        move |source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Build a [`CodecError::Malformed`] for `path`.
    pub fn malformed(path: &Path, reason: impl Into<String>) -> CodecError {
        CodecError::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
