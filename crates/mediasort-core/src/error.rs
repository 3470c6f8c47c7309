use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the mediasort library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Folder not found error
    #[error("Folder does not exist: {0}")]
    FolderNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Serialization / deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// User requested a stop. Not a failure: the run is abandoned cleanly
    /// and the checkpoint is left in place for resume.
    #[error("Operation stopped by user")]
    Stopped,

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Whether this error represents a user-requested stop rather than a failure.
    pub fn is_stop(&self) -> bool {
        matches!(self, Error::Stopped)
    }
}
