// this_file: src/error.rs
//! Error types for the cardpress library

use thiserror::Error;

/// Main error type for cardpress operations
#[derive(Debug, Error)]
pub enum Error {
    /// Image payload decoding error (malformed or unsupported input)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Compositing or encoding error on a drawing surface
    #[error("Render error: {0}")]
    Render(String),

    /// Fulfillment transport error (connection, TLS, request build)
    #[error("Submission error: {0}")]
    Submission(#[from] reqwest::Error),

    /// Invalid input parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Background task failure
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for cardpress operations
pub type Result<T> = std::result::Result<T, Error>;
