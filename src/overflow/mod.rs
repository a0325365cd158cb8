//! Disk tier for snapshot payloads.
//!
//! Payloads that no longer fit in the memory cache are appended as raw blocks
//! to a per-store overflow file. The file has no header or index of its own;
//! the record directory is the only map of its contents.

mod file;
mod root;

pub use file::OverflowManager;
pub use root::{StorageRoot, VolumeRoot};
