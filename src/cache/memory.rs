//! Ring-allocated byte arena.
//!
//! Payloads are stored contiguously in a single fixed allocation. New data is
//! written at the write cursor; when the tail of the arena is too short the
//! cursor wraps to the start, provided the oldest live payload has been
//! reclaimed far enough. Space is only ever reclaimed from the oldest end.

use crate::error::{Result, StoreError};
use crate::types::SnapshotIndex;
use std::collections::VecDeque;

/// A live payload in the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheSlot {
    /// Record owning the payload.
    pub index: SnapshotIndex,
    pub offset: usize,
    pub len: usize,
}

/// Positions of the live region inside the arena.
#[derive(Clone, Copy, Debug, Default)]
struct Cursor {
    /// Reclaim pointer: start of the oldest live payload.
    head: usize,
    /// Write cursor.
    tail: usize,
    /// Live data runs from `head` to the arena end and continues at zero.
    wrapped: bool,
}

impl Cursor {
    /// Offset a payload of `len` bytes would be written at.
    fn placement(&self, len: usize, capacity: usize, empty: bool) -> Option<usize> {
        if empty {
            return (len <= capacity).then_some(0);
        }

        if self.wrapped {
            (self.head - self.tail >= len).then_some(self.tail)
        } else if capacity - self.tail >= len {
            Some(self.tail)
        } else if self.head >= len {
            Some(0)
        } else {
            None
        }
    }

    /// Advance the reclaim pointer to the next oldest payload.
    fn reclaim(&mut self, next_head: Option<usize>) {
        match next_head {
            None => *self = Cursor::default(),
            Some(next) => {
                if self.wrapped && next < self.head {
                    self.wrapped = false;
                }
                self.head = next;
            }
        }
    }
}

/// Fixed-capacity memory cache.
pub struct MemoryCache {
    buf: Box<[u8]>,
    cursor: Cursor,
    /// Live payloads, oldest first.
    slots: VecDeque<CacheSlot>,
    used: usize,
}

impl MemoryCache {
    /// Allocate a cache of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            cursor: Cursor::default(),
            slots: VecDeque::new(),
            used: 0,
        }
    }

    /// Store a payload, returning its offset.
    ///
    /// Returns `None` without writing anything if the payload does not fit
    /// in contiguous free space.
    pub fn try_store(&mut self, index: SnapshotIndex, bytes: &[u8]) -> Option<usize> {
        let len = bytes.len();
        let empty = self.slots.is_empty();
        let offset = self.cursor.placement(len, self.capacity(), empty)?;

        if empty {
            self.cursor = Cursor::default();
        } else if !self.cursor.wrapped && offset < self.cursor.tail {
            self.cursor.wrapped = true;
        }

        self.buf[offset..offset + len].copy_from_slice(bytes);
        self.cursor.tail = offset + len;
        self.slots.push_back(CacheSlot { index, offset, len });
        self.used += len;

        Some(offset)
    }

    /// Oldest slots that must be evicted before `len` bytes fit.
    ///
    /// Empty when the payload already fits; `None` when it is larger than the
    /// whole cache.
    pub fn eviction_plan(&self, len: usize) -> Option<Vec<CacheSlot>> {
        let capacity = self.capacity();
        if len > capacity {
            return None;
        }

        let mut cursor = self.cursor;
        let mut plan = Vec::new();

        for (i, slot) in self.slots.iter().enumerate() {
            if cursor.placement(len, capacity, false).is_some() {
                return Some(plan);
            }
            plan.push(*slot);
            cursor.reclaim(self.slots.get(i + 1).map(|next| next.offset));
        }

        Some(plan)
    }

    /// Reclaim the oldest live payload.
    pub fn evict_oldest(&mut self) -> Option<CacheSlot> {
        let slot = self.slots.pop_front()?;
        self.used -= slot.len;
        self.cursor
            .reclaim(self.slots.front().map(|next| next.offset));
        Some(slot)
    }

    /// The oldest live payload, if any.
    pub fn oldest(&self) -> Option<&CacheSlot> {
        self.slots.front()
    }

    /// Read a live payload.
    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.capacity())
            .ok_or_else(|| {
                StoreError::corrupt(format!(
                    "cache range {}..{} exceeds capacity {}",
                    offset,
                    offset.saturating_add(len),
                    self.capacity()
                ))
            })?;

        if !self
            .slots
            .iter()
            .any(|slot| slot.offset == offset && slot.len == len)
        {
            return Err(StoreError::corrupt(format!(
                "cache range {}..{} has been reclaimed",
                offset, end
            )));
        }

        Ok(&self.buf[offset..end])
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes held by live payloads.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes not held by live payloads (not necessarily contiguous).
    pub fn remaining(&self) -> usize {
        self.capacity() - self.used
    }

    /// Live payloads, oldest first.
    pub fn live_slots(&self) -> impl Iterator<Item = &CacheSlot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(byte: u8, len: usize) -> Vec<u8> {
        vec![byte; len]
    }

    #[test]
    fn test_store_and_read() {
        let mut cache = MemoryCache::new(100);
        let a = cache.try_store(SnapshotIndex(0), &fill(1, 30)).unwrap();
        let b = cache.try_store(SnapshotIndex(1), &fill(2, 30)).unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, 30);
        assert_eq!(cache.read(a, 30).unwrap(), &fill(1, 30)[..]);
        assert_eq!(cache.read(b, 30).unwrap(), &fill(2, 30)[..]);
        assert_eq!(cache.used(), 60);
        assert_eq!(cache.remaining(), 40);
    }

    #[test]
    fn test_store_rejects_without_partial_write() {
        let mut cache = MemoryCache::new(100);
        cache.try_store(SnapshotIndex(0), &fill(1, 60)).unwrap();

        assert!(cache.try_store(SnapshotIndex(1), &fill(2, 60)).is_none());
        assert_eq!(cache.used(), 60);
        assert_eq!(cache.live_slots().count(), 1);
        assert_eq!(cache.read(0, 60).unwrap(), &fill(1, 60)[..]);
    }

    #[test]
    fn test_wraps_after_eviction() {
        let mut cache = MemoryCache::new(100);
        cache.try_store(SnapshotIndex(0), &fill(1, 40)).unwrap();
        cache.try_store(SnapshotIndex(1), &fill(2, 40)).unwrap();

        // 20 bytes left at the tail, not enough for 30.
        assert!(cache.try_store(SnapshotIndex(2), &fill(3, 30)).is_none());

        let evicted = cache.evict_oldest().unwrap();
        assert_eq!(evicted.index, SnapshotIndex(0));

        let offset = cache.try_store(SnapshotIndex(2), &fill(3, 30)).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(cache.read(40, 40).unwrap(), &fill(2, 40)[..]);
        assert_eq!(cache.read(0, 30).unwrap(), &fill(3, 30)[..]);

        // Wrapped: only 10 bytes free between cursor and reclaim pointer.
        assert!(cache.try_store(SnapshotIndex(3), &fill(4, 20)).is_none());
        assert!(cache.try_store(SnapshotIndex(3), &fill(4, 10)).is_some());
    }

    #[test]
    fn test_unwraps_when_high_part_reclaimed() {
        let mut cache = MemoryCache::new(100);
        cache.try_store(SnapshotIndex(0), &fill(1, 50)).unwrap();
        cache.try_store(SnapshotIndex(1), &fill(2, 40)).unwrap();
        cache.evict_oldest().unwrap();
        cache.try_store(SnapshotIndex(2), &fill(3, 30)).unwrap();

        // Reclaim the payload at 50..90; live data is now just 0..30.
        cache.evict_oldest().unwrap();

        let offset = cache.try_store(SnapshotIndex(3), &fill(4, 70)).unwrap();
        assert_eq!(offset, 30);
    }

    #[test]
    fn test_read_reclaimed_is_corrupt() {
        let mut cache = MemoryCache::new(100);
        cache.try_store(SnapshotIndex(0), &fill(1, 30)).unwrap();
        cache.try_store(SnapshotIndex(1), &fill(2, 30)).unwrap();
        cache.evict_oldest().unwrap();

        assert!(matches!(
            cache.read(0, 30),
            Err(StoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_read_past_capacity_is_corrupt() {
        let cache = MemoryCache::new(100);
        assert!(matches!(
            cache.read(90, 20),
            Err(StoreError::CorruptRecord { .. })
        ));
        assert!(matches!(
            cache.read(usize::MAX, 2),
            Err(StoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_eviction_plan() {
        let mut cache = MemoryCache::new(100);
        cache.try_store(SnapshotIndex(0), &fill(1, 40)).unwrap();
        cache.try_store(SnapshotIndex(1), &fill(2, 40)).unwrap();

        assert!(cache.eviction_plan(20).unwrap().is_empty());

        let plan = cache.eviction_plan(30).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].index, SnapshotIndex(0));

        let plan = cache.eviction_plan(100).unwrap();
        assert_eq!(plan.len(), 2);

        assert!(cache.eviction_plan(101).is_none());

        // Planning does not mutate.
        assert_eq!(cache.live_slots().count(), 2);
    }

    #[test]
    fn test_eviction_plan_matches_eviction() {
        let mut cache = MemoryCache::new(64);
        let mut next = 0;
        for len in [10, 20, 5, 25, 30, 12, 40, 8, 64, 3] {
            let plan = cache.eviction_plan(len).unwrap();
            for expected in &plan {
                assert_eq!(cache.evict_oldest().as_ref(), Some(expected));
            }
            assert!(cache.try_store(SnapshotIndex(next), &fill(next as u8, len)).is_some());
            next += 1;
        }
    }

    #[test]
    fn test_evict_all_resets_cursor() {
        let mut cache = MemoryCache::new(50);
        cache.try_store(SnapshotIndex(0), &fill(1, 45)).unwrap();
        cache.evict_oldest().unwrap();

        assert_eq!(cache.used(), 0);
        assert!(cache.evict_oldest().is_none());
        assert_eq!(cache.try_store(SnapshotIndex(1), &fill(2, 50)), Some(0));
    }
}
