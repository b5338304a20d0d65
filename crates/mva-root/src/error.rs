//! Error types for the ROOT reader.

use thiserror::Error;

/// Errors raised while parsing a ROOT file.
#[derive(Error, Debug)]
pub enum RootError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the `root` magic.
    #[error("not a ROOT file (bad magic)")]
    BadMagic,

    /// Attempt to read past the end of a buffer.
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Read position where the underflow happened.
        offset: usize,
        /// Bytes requested.
        need: usize,
        /// Bytes remaining.
        have: usize,
    },

    /// Compression block could not be decoded.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Streamed object did not match the expected layout.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Named key is absent from the directory.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Named object exists but is not a TTree.
    #[error("tree not found: {0}")]
    TreeNotFound(String),

    /// Branch lookup or decode failure.
    #[error("branch error: {0}")]
    Branch(String),

    /// Expression compilation or evaluation failure.
    #[error("expression error: {0}")]
    Expression(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RootError>;
