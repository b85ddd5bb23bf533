//! Centralized error types for reportrelay.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the reportrelay library.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Missing or invalid configuration. Fatal before any message is processed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The mail source rejected a request.
    #[error("Mail API error {status}: {message}")]
    MailApi { status: u16, message: String },

    /// Obtaining or refreshing credentials failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport-level HTTP failure.
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failure.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 or text decoding failure.
    #[error("Decoding error: {0}")]
    Decode(String),

    /// A MIME structure could not be interpreted.
    #[error("MIME decoding error: {0}")]
    MimeError(String),

    /// Text extraction from a binary document failed.
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    /// Drawing the report failed.
    #[error("Render error: {0}")]
    Render(String),

    /// PNG encoding failure.
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    /// The webhook answered with a non-success status.
    #[error("Webhook returned {status}: {body}")]
    Webhook { status: u16, body: String },
}

/// Convenience alias for `Result<T, RelayError>`.
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `RelayError::io`).
impl From<std::io::Error> for RelayError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

impl From<base64::DecodeError> for RelayError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}
