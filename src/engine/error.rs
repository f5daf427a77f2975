//! Error types for vector engine operations.

use thiserror::Error;

/// Errors raised by a [`VectorEngine`](super::VectorEngine) or a collection handle.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    #[error("Invalid collection name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("ID '{id}' already exists in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    #[error("ID '{id}' not found in collection '{collection}'")]
    IdNotFound { collection: String, id: String },

    #[error("Length mismatch: {ids} ids, {documents} documents, {metadatas} metadatas")]
    LengthMismatch {
        ids: usize,
        documents: usize,
        metadatas: usize,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Engine responded with HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Client is disconnected")]
    Disconnected,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
