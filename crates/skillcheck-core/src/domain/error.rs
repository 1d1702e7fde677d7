//! Domain-level error taxonomy for skillcheck.

use std::path::PathBuf;

/// Errors produced while decoding a judge's final message.
#[derive(Debug, thiserror::Error)]
pub enum VerdictDecodeError {
    #[error("judge output is empty")]
    Empty,

    #[error("judge output is not valid JSON: {source}: {preview}")]
    NotJson {
        #[source]
        source: serde_json::Error,
        preview: String,
    },
}

/// skillcheck domain errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("failed to read case file {path}: {source}")]
    CaseRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse case file {path}: {source}")]
    CaseParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("case is not runnable: {0}")]
    NotRunnable(String),

    #[error("unknown plan package variant: {0}")]
    UnknownVariant(String),

    #[error("verdict decode error: {0}")]
    Verdict(#[from] VerdictDecodeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for skillcheck domain operations.
pub type Result<T> = std::result::Result<T, EvalError>;
