//! Main UndoStore struct tying the tiers together.

use crate::cache::{CacheSlot, MemoryCache};
use crate::error::{Result, StoreError};
use crate::layer::{PixelLayer, UndoListener};
use crate::overflow::{OverflowManager, StorageRoot};
use crate::records::RecordDirectory;
use crate::types::{
    IntRect, Location, SnapshotIndex, SnapshotRecord, StoreState, UndoStats,
};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct UndoConfig {
    /// Size of the in-memory payload cache in bytes.
    pub memory_cache_size: usize,

    /// Free space that must remain on the volume after an overflow write.
    pub disk_safety_margin: u64,

    /// Number of payloads read back from disk kept in memory (0 disables).
    pub disk_read_cache_records: usize,

    /// File name prefix for the overflow file.
    pub overflow_file_prefix: String,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            memory_cache_size: 4 * 1024 * 1024,
            disk_safety_margin: 16 * 1024 * 1024,
            disk_read_cache_records: 8,
            overflow_file_prefix: "layer-undo".to_string(),
        }
    }
}

impl UndoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.memory_cache_size == 0 {
            return Err(StoreError::InvalidConfig(
                "memory_cache_size must be greater than zero".into(),
            ));
        }
        if self.overflow_file_prefix.is_empty()
            || self.overflow_file_prefix.contains(std::path::is_separator)
        {
            return Err(StoreError::InvalidConfig(format!(
                "invalid overflow file prefix {:?}",
                self.overflow_file_prefix
            )));
        }
        Ok(())
    }
}

/// State guarded by the store lock.
struct Tiers {
    directory: RecordDirectory,
    cache: MemoryCache,
    overflow: OverflowManager,
}

impl Tiers {
    /// Find a home for a new payload, spilling old payloads to disk if needed.
    ///
    /// Nothing is evicted unless the disk has room for everything that must
    /// be written.
    fn place(&mut self, index: SnapshotIndex, bytes: &[u8]) -> Result<Location> {
        let len = bytes.len();

        let plan = match self.cache.eviction_plan(len) {
            Some(plan) => plan,
            None => {
                // Larger than the whole cache.
                self.overflow.ensure_disk_space(len as u64)?;
                let region = self.overflow.write(bytes)?;
                tracing::debug!(%index, len, "payload exceeds memory cache, stored on disk");
                return Ok(Location::OnDisk(region));
            }
        };

        if !plan.is_empty() {
            let spill: u64 = plan.iter().map(|slot| slot.len as u64).sum();
            self.overflow.ensure_disk_space(spill)?;
            for slot in &plan {
                self.spill(slot)?;
            }
            tracing::debug!(records = plan.len(), bytes = spill, "spilled oldest snapshots to disk");
        }

        let offset = self.cache.try_store(index, bytes).ok_or_else(|| {
            StoreError::corrupt(format!("no cache space for {} bytes after eviction", len))
        })?;

        Ok(Location::InMemory { offset, len })
    }

    /// Copy the oldest cached payload to disk, repoint its record, then
    /// reclaim its cache space.
    fn spill(&mut self, slot: &CacheSlot) -> Result<()> {
        if self.cache.oldest() != Some(slot) {
            return Err(StoreError::corrupt(format!(
                "eviction out of order at record {}",
                slot.index
            )));
        }

        let bytes = self.cache.read(slot.offset, slot.len)?;
        let region = self.overflow.write(bytes)?;
        self.directory
            .set_location(slot.index, Location::OnDisk(region))?;
        self.cache.evict_oldest();
        Ok(())
    }

    /// Fetch a record's payload from whichever tier holds it.
    fn fetch(&mut self, record: &SnapshotRecord) -> Result<Cow<'_, [u8]>> {
        match record.location {
            Location::InMemory { offset, len } => Ok(Cow::Borrowed(self.cache.read(offset, len)?)),
            Location::OnDisk(region) => Ok(Cow::Owned(self.overflow.read(region)?)),
            Location::Unavailable => Err(StoreError::corrupt("payload is unavailable")),
        }
    }
}

/// Undo history for a single raster layer.
///
/// Captures rectangular regions of the layer's pixels into a bounded memory
/// cache, moving the oldest payloads to an overflow file when the cache is
/// full. Snapshots are addressed by a stable [`SnapshotIndex`].
///
/// All operations take `&self`; a single lock serializes captures and
/// restores, so a store can be shared across threads behind an `Arc`.
pub struct UndoStore {
    /// Store configuration.
    config: UndoConfig,

    /// Layer being recorded (not owned).
    layer: Weak<dyn PixelLayer>,

    /// Told about every non-automatic capture.
    listener: Option<Arc<dyn UndoListener>>,

    /// Directory, cache and overflow file.
    tiers: Mutex<Tiers>,
}

impl UndoStore {
    /// Create a store recording `layer`, overflowing into `root`.
    pub fn new<L: PixelLayer + 'static>(
        config: UndoConfig,
        layer: &Arc<L>,
        root: Arc<dyn StorageRoot>,
    ) -> Result<Self> {
        config.validate()?;

        let layer: Weak<L> = Arc::downgrade(layer);
        let layer: Weak<dyn PixelLayer> = layer;
        let tiers = Tiers {
            directory: RecordDirectory::new(),
            cache: MemoryCache::new(config.memory_cache_size),
            overflow: OverflowManager::new(
                root,
                config.overflow_file_prefix.clone(),
                config.disk_safety_margin,
                config.disk_read_cache_records,
            ),
        };

        Ok(Self {
            config,
            layer,
            listener: None,
            tiers: Mutex::new(tiers),
        })
    }

    /// Attach the undo manager notified of new snapshots.
    pub fn with_listener(mut self, listener: Arc<dyn UndoListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    fn layer(&self) -> Result<Arc<dyn PixelLayer>> {
        self.layer.upgrade().ok_or(StoreError::LayerReleased)
    }

    // --- Snapshot Operations ---

    /// Record the current pixels of `rect`.
    ///
    /// `rect` is clipped to the layer bounds. The layer is never modified.
    /// Unless `automatic`, the listener is told about the new index.
    ///
    /// On failure no record is added; payloads already moved to disk while
    /// making room stay valid there.
    pub fn capture_snapshot(&self, rect: IntRect, automatic: bool) -> Result<SnapshotIndex> {
        let layer = self.layer()?;
        let rect = rect.intersect(&layer.bounds());
        let expected = rect.byte_len(layer.bytes_per_pixel());

        let index = {
            let mut tiers = self.tiers.lock();

            let pixels = if rect.is_empty() {
                Vec::new()
            } else {
                layer.read_pixels(rect)
            };
            if pixels.len() != expected {
                return Err(StoreError::PayloadSizeMismatch {
                    expected,
                    got: pixels.len(),
                });
            }

            let index = SnapshotIndex(tiers.directory.len());
            let location = tiers.place(index, &pixels)?;
            let record = SnapshotRecord {
                rect,
                payload_size: pixels.len(),
                checksum: crc32fast::hash(&pixels),
                location,
            };
            let assigned = tiers.directory.append(record);
            debug_assert_eq!(assigned, index);

            tracing::trace!(%index, ?rect, ?location, automatic, "captured snapshot");
            index
        };

        if !automatic {
            if let Some(listener) = &self.listener {
                listener.record_created(index);
            }
        }

        Ok(index)
    }

    /// Write snapshot `index` back into the layer.
    ///
    /// Unless `automatic`, the layer is then told the region changed so it
    /// can update and redraw. Undo/redo bookkeeping is left to the caller.
    /// Returns the restored rectangle.
    pub fn restore_snapshot(&self, index: SnapshotIndex, automatic: bool) -> Result<IntRect> {
        let layer = self.layer()?;

        let rect = {
            let mut tiers = self.tiers.lock();
            let record = tiers.directory.get(index)?.clone();

            let payload = tiers.fetch(&record).map_err(|e| {
                tracing::warn!(%index, error = %e, "failed to fetch snapshot payload");
                e.for_record(index)
            })?;

            if payload.len() != record.payload_size {
                return Err(StoreError::CorruptRecord {
                    index: Some(index),
                    reason: format!(
                        "payload is {} bytes, record says {}",
                        payload.len(),
                        record.payload_size
                    ),
                });
            }
            if crc32fast::hash(&payload) != record.checksum {
                tracing::warn!(%index, "snapshot checksum mismatch");
                return Err(StoreError::CorruptRecord {
                    index: Some(index),
                    reason: "checksum mismatch".into(),
                });
            }

            if !record.rect.is_empty() {
                layer.write_pixels(record.rect, &payload);
            }

            tracing::trace!(%index, rect = ?record.rect, automatic, "restored snapshot");
            record.rect
        };

        if !automatic {
            layer.notify_region_changed(rect);
        }

        Ok(rect)
    }

    /// Whether `required` bytes (plus the configured margin) fit on the
    /// overflow volume.
    pub fn check_disk_space(&self, required: u64) -> Result<bool> {
        self.tiers.lock().overflow.check_disk_space(required)
    }

    // --- Inspection ---

    /// Get a copy of a record.
    pub fn record(&self, index: SnapshotIndex) -> Result<SnapshotRecord> {
        self.tiers.lock().directory.get(index).cloned()
    }

    /// Number of snapshots captured.
    pub fn len(&self) -> usize {
        self.tiers.lock().directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> StoreState {
        if self.is_empty() {
            StoreState::Empty
        } else {
            StoreState::Recording
        }
    }

    /// Path of the overflow file, once something has been written to disk.
    pub fn overflow_path(&self) -> Option<PathBuf> {
        self.tiers.lock().overflow.path().map(|p| p.to_path_buf())
    }

    pub fn config(&self) -> &UndoConfig {
        &self.config
    }

    /// Get store statistics.
    pub fn stats(&self) -> UndoStats {
        let tiers = self.tiers.lock();
        let mut stats = UndoStats {
            record_count: tiers.directory.len(),
            memory_cache_used: tiers.cache.used(),
            memory_cache_capacity: tiers.cache.capacity(),
            overflow_file_bytes: tiers.overflow.len(),
            disk_read_cache_hits: tiers.overflow.read_cache_hits(),
            ..Default::default()
        };

        for (_, record) in tiers.directory.iter() {
            match record.location {
                Location::InMemory { .. } => stats.in_memory_records += 1,
                Location::OnDisk(_) => stats.on_disk_records += 1,
                Location::Unavailable => stats.unavailable_records += 1,
            }
        }

        stats
    }
}
