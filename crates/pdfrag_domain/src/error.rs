use std::path::PathBuf;

use crate::EmbeddingSignature;

/// Failures talking to the generation service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Could not reach the generation service: {0}")]
    Transport(String),

    #[error("Generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response from the generation service: {0}")]
    Protocol(String),

    #[error("Generation service returned an empty answer")]
    EmptyResponse,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Cannot create an index from an empty corpus")]
    EmptyCorpus,

    #[error(
        "Index at {} is unusable: {reason}. Run with --reset to rebuild it",
        path.display()
    )]
    StorageCorruption { path: PathBuf, reason: String },

    #[error("Index was built with {expected} but the query embedder produced {actual}")]
    EmbeddingMismatch {
        expected: EmbeddingSignature,
        actual: EmbeddingSignature,
    },

    #[error("No relevant context found")]
    NoContext,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Errors after which an interactive session can keep taking queries.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoContext | Error::Generation(_) | Error::Embedding(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
