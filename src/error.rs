//! Error types for the undo store.

use crate::types::SnapshotIndex;
use thiserror::Error;

/// Main error type for undo store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `len` is `None` when the index was rejected before reaching a store.
    #[error(
        "Snapshot index {index} out of range{}",
        .len.map(|len| format!(" (len is {})", len)).unwrap_or_default()
    )]
    IndexOutOfRange { index: i64, len: Option<usize> },

    #[error("Insufficient disk space: need {required} bytes, {available} available")]
    InsufficientDiskSpace { required: u64, available: u64 },

    #[error("Corrupt record {index:?}: {reason}")]
    CorruptRecord {
        index: Option<SnapshotIndex>,
        reason: String,
    },

    #[error("Layer pixels returned {got} bytes, expected {expected}")]
    PayloadSizeMismatch { expected: usize, got: usize },

    #[error("Layer has been released")]
    LayerReleased,

    #[error("Overflow file is locked by another store")]
    Locked,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Corruption not yet attributed to a record.
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        StoreError::CorruptRecord {
            index: None,
            reason: reason.into(),
        }
    }

    /// Attach a record index to a corruption error raised by a lower tier.
    pub(crate) fn for_record(self, index: SnapshotIndex) -> Self {
        match self {
            StoreError::CorruptRecord { index: None, reason } => StoreError::CorruptRecord {
                index: Some(index),
                reason,
            },
            other => other,
        }
    }
}

/// Result type for undo store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
