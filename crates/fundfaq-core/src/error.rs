use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No chunks generated - ensure the scheme and guide directories contain records.")]
    NoChunks,

    #[error("Malformed source record {path}: {reason}")]
    MalformedSource { path: PathBuf, reason: String },

    #[error("Vector store missing at {dir}. Run `fundfaq build` first.")]
    VectorStoreMissing { dir: PathBuf },

    #[error("Index has {index_rows} rows but document store has {documents} entries; rebuild the vector store")]
    Misaligned { index_rows: usize, documents: usize },

    #[error("Document store does not match the index fingerprint; rebuild the vector store")]
    FingerprintMismatch,

    #[error("Embedding dimension mismatch: index expects {expected}, embedder produces {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index was built with embedder '{index}' but '{runtime}' is configured; rebuild the vector store")]
    EmbedderMismatch { index: String, runtime: String },

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedSource { path: path.into(), reason: reason.into() }
    }

    /// True for the "query before build" condition, which callers report
    /// differently from every other failure.
    pub fn is_store_missing(&self) -> bool {
        matches!(self, Self::VectorStoreMissing { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
