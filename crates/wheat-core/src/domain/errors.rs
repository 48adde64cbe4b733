//! Errors - failures that cross layer boundaries.
//!
//! Remote lookup failures never show up here: the lookup port reports them as
//! absent results. What remains is storage, local I/O, configuration and
//! cancellation.

use std::path::PathBuf;

use thiserror::Error;

/// Persistent store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an enrichment run stopped early.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Cooperative cancellation observed at a suspension point.
    #[error("enrichment cancelled")]
    Cancelled,

    #[error("failed to persist enrichment batch: {0}")]
    Store(#[from] StoreError),
}

/// Collection import failure.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("collection file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read collection file: {0}")]
    Io(#[from] std::io::Error),

    #[error("collection file is missing the '{0}' column")]
    MissingColumn(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Chaff report failure.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write chaff report: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown target format '{0}'")]
    UnknownFormat(String),

    #[error("invalid value for {key}: '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}
