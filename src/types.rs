//! Core types for the undo store.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable index of a captured snapshot.
///
/// Indices are assigned in capture order starting at zero and always refer
/// to the same snapshot for the lifetime of the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotIndex(pub usize);

impl fmt::Debug for SnapshotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({})", self.0)
    }
}

impl fmt::Display for SnapshotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signed indices come from undo managers that use `-1` style sentinels;
/// anything negative is out of range.
impl TryFrom<i64> for SnapshotIndex {
    type Error = StoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .map(SnapshotIndex)
            .map_err(|_| StoreError::IndexOutOfRange {
                index: value,
                len: None,
            })
    }
}

/// Rectangle in layer space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl IntRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Overlap of two rectangles, empty (at `self`'s origin) if they are disjoint.
    pub fn intersect(&self, other: &IntRect) -> IntRect {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = (self.x as i64 + self.width as i64).min(other.x as i64 + other.width as i64);
        let bottom =
            (self.y as i64 + self.height as i64).min(other.y as i64 + other.height as i64);

        if right <= left || bottom <= top {
            return IntRect::new(self.x, self.y, 0, 0);
        }

        IntRect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
    }

    /// Byte length of this rectangle's pixels at the given pixel size.
    pub fn byte_len(&self, bytes_per_pixel: usize) -> usize {
        self.width as usize * self.height as usize * bytes_per_pixel
    }
}

impl fmt::Debug for IntRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IntRect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Byte range inside the overflow file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRegion {
    pub offset: u64,
    pub len: u64,
}

impl FileRegion {
    /// End offset, `None` if it overflows.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.len)
    }
}

/// Where a snapshot's payload currently lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// Slot in the memory cache.
    InMemory { offset: usize, len: usize },
    /// Region of the overflow file.
    OnDisk(FileRegion),
    /// Payload was lost (evicted without a disk copy).
    Unavailable,
}

impl Location {
    pub fn is_in_memory(&self) -> bool {
        matches!(self, Location::InMemory { .. })
    }

    pub fn is_on_disk(&self) -> bool {
        matches!(self, Location::OnDisk(_))
    }
}

/// One captured state of a layer region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Layer-space rectangle the payload covers.
    pub rect: IntRect,
    /// Payload byte length (`width * height * bytes_per_pixel`).
    pub payload_size: usize,
    /// CRC32 of the payload taken at capture time.
    pub checksum: u32,
    /// Current tier of the payload.
    pub location: Location,
}

/// Lifecycle of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreState {
    /// No snapshot captured yet.
    Empty,
    /// At least one snapshot captured.
    Recording,
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoStats {
    pub record_count: usize,
    pub in_memory_records: usize,
    pub on_disk_records: usize,
    pub unavailable_records: usize,
    pub memory_cache_used: usize,
    pub memory_cache_capacity: usize,
    pub overflow_file_bytes: u64,
    pub disk_read_cache_hits: u64,
}
