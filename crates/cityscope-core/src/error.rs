//! Error types for cityscope-rs.

use thiserror::Error;

/// The main error type for cityscope-rs operations.
#[derive(Error, Debug)]
pub enum CityscopeError {
    /// A layer with the given id is already registered.
    #[error("layer '{0}' already exists")]
    LayerExists(String),

    /// A layer with the given id was not found.
    #[error("layer '{0}' not found")]
    LayerNotFound(String),

    /// A geometry source with the given name was not found.
    #[error("source '{0}' not found")]
    SourceNotFound(String),

    /// A raw dataset could not be fetched or parsed.
    #[error("failed to fetch dataset '{name}': {reason}")]
    FetchFailed { name: String, reason: String },

    /// A paint color could not be parsed.
    #[error("invalid color '{0}'")]
    InvalidColor(String),

    /// A feature collection was not valid GeoJSON.
    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for cityscope-rs operations.
pub type Result<T> = std::result::Result<T, CityscopeError>;
