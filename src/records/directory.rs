//! Append-only table of snapshot records.

use crate::error::{Result, StoreError};
use crate::types::{Location, SnapshotIndex, SnapshotRecord};

/// Number of records reserved each time the directory runs out of room.
pub const RECORDS_PER_GROWTH: usize = 150;

/// Ordered, append-only table of snapshot records.
#[derive(Debug, Default)]
pub struct RecordDirectory {
    records: Vec<SnapshotRecord>,
}

impl RecordDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record, returning its index.
    pub fn append(&mut self, record: SnapshotRecord) -> SnapshotIndex {
        if self.records.len() == self.records.capacity() {
            self.records.reserve_exact(RECORDS_PER_GROWTH);
        }

        let index = SnapshotIndex(self.records.len());
        self.records.push(record);
        index
    }

    /// Get a record by index.
    pub fn get(&self, index: SnapshotIndex) -> Result<&SnapshotRecord> {
        self.records
            .get(index.0)
            .ok_or(StoreError::IndexOutOfRange {
                index: index.0 as i64,
                len: Some(self.records.len()),
            })
    }

    /// Move a record to another tier.
    pub(crate) fn set_location(&mut self, index: SnapshotIndex, location: Location) -> Result<()> {
        let len = self.records.len();
        let record = self
            .records
            .get_mut(index.0)
            .ok_or(StoreError::IndexOutOfRange {
                index: index.0 as i64,
                len: Some(len),
            })?;
        record.location = location;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Allocated record slots.
    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// Iterate records with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (SnapshotIndex, &SnapshotRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| (SnapshotIndex(i), record))
    }
}
