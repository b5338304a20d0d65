//! Render error type.

use thiserror::Error;

/// Errors raised while rendering a diagnostic plot.
#[derive(Error, Debug)]
pub enum RenderError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input data cannot be plotted
    #[error("cannot plot: {0}")]
    EmptyInput(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RenderError>;
