use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The embedding model was unavailable or produced an unusable vector.
    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    /// Persisted vectors and texts disagree; the index must not be served.
    #[error("Corrupt index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Index contains no passages")]
    EmptyCorpus,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptIndex { path: path.into(), reason: reason.into() }
    }

    /// Data-integrity failures. These are never recovered locally: they mean an
    /// ingestion run went wrong and serving has to stop until it is rebuilt.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. } | Self::IndexBuild(_) | Self::CorruptIndex { .. })
    }

    /// Failures of an external collaborator that a request layer may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EmbeddingFailure(_) | Self::Generation(_) | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
