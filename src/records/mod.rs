//! Snapshot record directory.
//!
//! Records are appended in capture order and addressed by a stable
//! [`SnapshotIndex`](crate::types::SnapshotIndex).

mod directory;

pub use directory::{RecordDirectory, RECORDS_PER_GROWTH};
