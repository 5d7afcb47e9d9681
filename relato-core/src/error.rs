//! Error types for relato-core

use thiserror::Error;

/// Main error type for the relato-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Required form fields are missing or empty
    #[error("validation error: {0}")]
    Validation(String),

    /// Photo bytes could not be decoded as an image
    #[error("image decode error: {0}")]
    Decode(String),

    /// Re-encoding the photo as JPEG failed
    #[error("image encode error: {0}")]
    Encode(String),

    /// A report could not be delivered to the collector
    #[error("transmission error: {0}")]
    Transmission(String),

    /// The storage medium is out of space
    #[error("storage quota exceeded: {0}")]
    StorageQuota(String),

    /// A record with this id is already queued
    #[error("duplicate report id: {0}")]
    DuplicateId(String),

    /// Storage medium error
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for relato-core
pub type Result<T> = std::result::Result<T, Error>;
