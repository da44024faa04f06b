use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store not found at {}", .0.display())]
    StoreNotFound(PathBuf),

    #[error("Vector store operation failed: {0}")]
    Store(String),

    #[error("Duplicate chunk id: {0}")]
    DuplicateChunk(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Undefined similarity score for chunk {chunk_id}")]
    InvalidScore { chunk_id: String },

    #[error("Generation backend unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Document source error: {0}")]
    Source(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Internal consistency failures. These are never downgraded to a
    /// fallback path by callers.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. } | Self::InvalidScore { .. })
    }

    pub fn store<E: std::fmt::Display>(e: E) -> Self { Self::Store(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, Error>;
