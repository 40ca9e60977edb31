//! Error types for resource loading.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File exists but holds no bytes where content is required.
    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),

    /// IO error during file operations.
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image decoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
