//! Error types shared across the mvaprep crates.

use thiserror::Error;

/// Top-level error type for configuration and validation failures.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing error
    #[error("config error: {0}")]
    Config(#[from] serde_yaml_ng::Error),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
