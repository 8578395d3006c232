//! Error types for fileupload.

use thiserror::Error;

/// Common error type for fileupload.
#[derive(Error, Debug)]
pub enum FileUploadError {
    /// Filesystem error (rename, move, copy, delete, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path-based lookup found nothing.
    #[error("{0} not found")]
    NotFound(String),

    /// Metadata store error.
    ///
    /// Wraps errors from any store backend. Errors from sqlx are
    /// converted automatically.
    #[error("store error: {0}")]
    Store(String),

    /// The request carried no file.
    #[error("no file provided")]
    NoFileProvided,

    /// The filename generator could not find a free name.
    #[error("no free file name after {attempts} attempts")]
    NameSpaceExhausted {
        /// Number of candidates tried.
        attempts: usize,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FileUploadError {
    fn from(e: sqlx::Error) -> Self {
        FileUploadError::Store(e.to_string())
    }
}

/// Result type alias for fileupload operations.
pub type Result<T> = std::result::Result<T, FileUploadError>;
