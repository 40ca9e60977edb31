//! Error types for platform and configuration code.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type outside the RHI layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan calls made outside the RHI (surface creation, extension queries)
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config error in '{path}': {message}")]
    Config {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Result type alias using the core Error type.
pub type Result<T> = std::result::Result<T, Error>;
