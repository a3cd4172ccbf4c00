//! Crate error types.

mod context;

pub use context::{OptionExt, ResultExt};

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SynctraceError>;

#[derive(Debug, Error)]
pub enum SynctraceError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("line {line}: {message}")]
    Ingest { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{context}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Raised when a persisted epoch-millisecond timestamp cannot be
/// represented as a `DateTime<Utc>`.
#[derive(Debug, Error)]
#[error("timestamp out of range: {0} ms")]
pub struct TimestampOutOfRange(pub i64);
