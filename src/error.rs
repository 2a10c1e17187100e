use std::time::Duration;

use thiserror::Error;

/// Invalid configuration, detected once before any planning starts
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("min duration ({min}s) must be below max duration ({max}s)")]
    DurationRange { min: f64, max: f64 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("window length ({window}s) must exceed overlap ({overlap}s)")]
    WindowOverlap { window: f64, overlap: f64 },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

/// Failure of a single judge call; recorded as a warning, never fatal
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("window {window} timed out after {after:?}")]
    Timeout { window: usize, after: Duration },

    #[error("window {window} judge failed: {message}")]
    Failed { window: usize, message: String },

    #[error("window {window} returned an unreadable response: {source}")]
    InvalidResponse {
        window: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("window {window} judge io error: {source}")]
    Io {
        window: usize,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} already exists")]
    AlreadyExists(String),

    #[error("job {0} not found")]
    NotFound(String),

    #[error("job id {0:?} is not a plain name")]
    InvalidId(String),

    #[error("job store failure for {id}: {message}")]
    Storage { id: String, message: String },
}
