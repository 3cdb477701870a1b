//! Writer error types

use thiserror::Error;

/// Main writer error type
#[derive(Debug, Error)]
pub enum WriterError {
    // ========== Caller Errors ==========
    /// No file path given
    #[error("no file path given")]
    NullPath,

    /// A live writer already owns this path
    #[error("a writer is already registered for path: {0}")]
    PathConflict(String),

    /// Write attempted after dispose
    #[error("writer for path {0} is already disposed")]
    AlreadyDisposed(String),

    // ========== Filesystem Errors ==========
    /// Underlying filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Worker-State Assertions ==========
    /// Worker start requested while already running.
    /// Indicates a registry bookkeeping bug, not a caller-facing condition.
    #[error("background worker already running")]
    AlreadyRunning,

    /// Worker stop requested while already stopped.
    /// Indicates a registry bookkeeping bug, not a caller-facing condition.
    #[error("background worker already stopped")]
    AlreadyStopped,
}

/// Result type alias for writer operations
pub type WriterResult<T> = Result<T, WriterError>;
