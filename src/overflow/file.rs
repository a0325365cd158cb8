//! Overflow file management.

use crate::error::{Result, StoreError};
use crate::types::FileRegion;
use fs2::FileExt;
use lru::LruCache;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::StorageRoot;

/// Distinguishes overflow files of stores living in the same process.
static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

/// An open, exclusively locked overflow file.
struct BackingFile {
    path: PathBuf,
    file: File,
    len: u64,
}

impl BackingFile {
    fn create(dir: &Path, prefix: &str) -> Result<Self> {
        let id = NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{}-{}-{}.undo", prefix, std::process::id(), id));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        if let Err(e) = lock_exclusive(&file) {
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        tracing::debug!(path = %path.display(), "created overflow file");

        Ok(Self { path, file, len: 0 })
    }
}

/// Take the exclusive lock on an overflow file.
///
/// A freshly created file is normally unlocked; this still guards against
/// another process picking the same name between create and lock.
fn lock_exclusive(file: &File) -> Result<()> {
    file.try_lock_exclusive().map_err(|_| StoreError::Locked)
}

impl Drop for BackingFile {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove overflow file");
        }
    }
}

/// Writes payloads to a per-store overflow file and reads them back.
///
/// The file is created on the first write and removed when the manager is
/// dropped. It only grows; regions are never reused.
pub struct OverflowManager {
    root: Arc<dyn StorageRoot>,
    prefix: String,
    safety_margin: u64,
    backing: Option<BackingFile>,
    /// Payloads recently read back, keyed by file offset.
    read_cache: Option<LruCache<u64, Vec<u8>>>,
    read_cache_hits: u64,
    /// Writes left before `write` starts failing.
    #[cfg(test)]
    pub(crate) writes_before_failure: Option<usize>,
}

impl OverflowManager {
    pub fn new(
        root: Arc<dyn StorageRoot>,
        prefix: impl Into<String>,
        safety_margin: u64,
        read_cache_size: usize,
    ) -> Self {
        Self {
            root,
            prefix: prefix.into(),
            safety_margin,
            backing: None,
            read_cache: NonZeroUsize::new(read_cache_size).map(LruCache::new),
            read_cache_hits: 0,
            #[cfg(test)]
            writes_before_failure: None,
        }
    }

    /// Whether `required` bytes plus the safety margin fit on the volume.
    pub fn check_disk_space(&self, required: u64) -> Result<bool> {
        let available = self.root.free_space()?;
        Ok(self.fits(required, available))
    }

    /// Like [`check_disk_space`](Self::check_disk_space), but failing with
    /// `InsufficientDiskSpace`.
    pub(crate) fn ensure_disk_space(&self, required: u64) -> Result<()> {
        let available = self.root.free_space()?;
        if self.fits(required, available) {
            Ok(())
        } else {
            tracing::warn!(required, available, "not enough disk space for undo overflow");
            Err(StoreError::InsufficientDiskSpace {
                required,
                available,
            })
        }
    }

    fn fits(&self, required: u64, available: u64) -> bool {
        required
            .checked_add(self.safety_margin)
            .is_some_and(|needed| needed <= available)
    }

    /// Append a payload, returning where it was written.
    ///
    /// A failed write truncates the file back to its previous length.
    pub fn write(&mut self, bytes: &[u8]) -> Result<FileRegion> {
        #[cfg(test)]
        self.count_down_write()?;

        let backing = match self.backing {
            Some(ref mut backing) => backing,
            None => self
                .backing
                .insert(BackingFile::create(self.root.location(), &self.prefix)?),
        };

        let offset = backing.len;
        let result = backing
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| backing.file.write_all(bytes));

        if let Err(e) = result {
            let _ = backing.file.set_len(offset);
            return Err(e.into());
        }

        backing.len = offset + bytes.len() as u64;

        Ok(FileRegion {
            offset,
            len: bytes.len() as u64,
        })
    }

    /// Read a previously written region.
    pub fn read(&mut self, region: FileRegion) -> Result<Vec<u8>> {
        let file_len = self.len();
        if region.end().map_or(true, |end| end > file_len) {
            return Err(StoreError::corrupt(format!(
                "overflow region {}+{} beyond file length {}",
                region.offset, region.len, file_len
            )));
        }

        if let Some(cache) = self.read_cache.as_mut() {
            if let Some(bytes) = cache.get(&region.offset) {
                if bytes.len() as u64 == region.len {
                    self.read_cache_hits += 1;
                    return Ok(bytes.clone());
                }
            }
        }

        let backing = self
            .backing
            .as_mut()
            .ok_or_else(|| StoreError::corrupt("overflow file was never created"))?;

        let mut bytes = vec![0u8; region.len as usize];
        backing.file.seek(SeekFrom::Start(region.offset))?;
        backing.file.read_exact(&mut bytes)?;

        if let Some(cache) = self.read_cache.as_mut() {
            cache.put(region.offset, bytes.clone());
        }

        Ok(bytes)
    }

    #[cfg(test)]
    fn count_down_write(&mut self) -> Result<()> {
        match self.writes_before_failure.as_mut() {
            Some(0) => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            )
            .into()),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Current overflow file length (zero before the first write).
    pub fn len(&self) -> u64 {
        self.backing.as_ref().map_or(0, |b| b.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the overflow file, once created.
    pub fn path(&self) -> Option<&Path> {
        self.backing.as_ref().map(|b| b.path.as_path())
    }

    /// Reads answered from the read cache.
    pub fn read_cache_hits(&self) -> u64 {
        self.read_cache_hits
    }
}
