//! Error types for daykeep-core

use thiserror::Error;

/// Result type alias using daykeep-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in daykeep-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entity is missing its identifier; merging it would silently drop data
    #[error("Malformed {collection} entity: {detail}")]
    MalformedEntity {
        collection: &'static str,
        detail: String,
    },

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
