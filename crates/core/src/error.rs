//! Error types for paclean
//!
//! `Error` covers batch-level failures (bad configuration, unreadable input).
//! Problems with a single record never surface here; they are recorded as
//! [`crate::audit::Issue`] entries and the batch carries on.

use thiserror::Error;

/// Main error type for paclean operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("CRS {0} is projected but not a known equal-area projection")]
    CrsNotEqualArea(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

/// Result type alias for paclean operations
pub type Result<T> = std::result::Result<T, Error>;
