use std::path::PathBuf;

use wsr_types::TypeError;

/// Errors from world-state operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A key or namespace broke the naming rules.
    #[error(transparent)]
    InvalidInput(#[from] TypeError),

    /// A key read by the transaction was changed by a commit in between.
    #[error("MVCC read conflict on key {key:?}")]
    MvccConflict { key: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another handle already owns the state directory.
    #[error("world state directory {} is locked by another process", .0.display())]
    Locked(PathBuf),

    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),

    /// The journal does not form a valid block chain.
    #[error("corrupt journal at block {block}: {reason}")]
    Corrupt { block: u64, reason: String },
}

/// Result alias for world-state operations.
pub type StateResult<T> = Result<T, StateError>;
