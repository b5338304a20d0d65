//! Error type for table assembly and histogram export.

use thiserror::Error;

/// Errors raised while building event tables or exporting histograms.
#[derive(Error, Debug)]
pub enum DataError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ROOT file error
    #[error("ROOT file error: {0}")]
    Root(#[from] mva_root::RootError),

    /// Output serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Weight-treatment error
    #[error("weight error: {0}")]
    Weights(String),

    /// Input-layout error
    #[error("input error: {0}")]
    Input(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DataError>;
