//! Server-level errors. Anything scoped to a single connection is logged
//! and confined there; only setup problems surface through these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to load server config from {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("connection id generation failed: {0}")]
    IdGeneration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
