//! Error types for the tracker module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while scanning or moving images.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The images directory does not exist or cannot be read.
    #[error("cannot read images directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the processed directory.
    #[error("failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file to move is not directly inside the tracked directory.
    #[error("{path} is not an image in the tracked directory")]
    NotTracked { path: PathBuf },

    /// Failed to move a file to the processed directory.
    #[error("failed to move {source_path} to {destination}")]
    MoveFailed {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to hash a file.
    #[error("failed to read {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
