//! Error types for the exreview library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for exreview operations.
///
/// Per-record review failures are never represented here; they are captured
/// as [`ReviewOutcome`](crate::ReviewOutcome) data. This type covers the
/// failures that stop a run: configuration, the record source and the sink.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error from the exercise database.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The record source could not be reached or queried.
    #[error("Record source error: {0}")]
    Source(String),

    /// The external model call failed.
    #[error("Model error: {0}")]
    Model(String),

    /// The result sink is unreadable or could not be written.
    #[error("Sink error: {0}")]
    Sink(String),
}

impl ReviewError {
    /// Build an IO error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReviewError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for exreview operations.
pub type Result<T> = std::result::Result<T, ReviewError>;
