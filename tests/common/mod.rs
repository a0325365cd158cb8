//! Test layer and storage roots shared by the integration tests.

#![allow(dead_code)]

use layer_undo::{IntRect, PixelLayer, StorageRoot, UndoConfig, UndoStore, VolumeRoot};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// In-memory layer with packed rows of `bpp`-byte pixels.
pub struct TestLayer {
    pub width: u32,
    pub height: u32,
    pub bpp: usize,
    pub pixels: Mutex<Vec<u8>>,
    pub writes: Mutex<Vec<IntRect>>,
    pub notified: Mutex<Vec<IntRect>>,
}

impl TestLayer {
    pub fn new(width: u32, height: u32, bpp: usize) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            bpp,
            pixels: Mutex::new(vec![0; width as usize * height as usize * bpp]),
            writes: Mutex::new(Vec::new()),
            notified: Mutex::new(Vec::new()),
        })
    }

    /// Paint `rect` with bytes derived from `seed`.
    pub fn paint(&self, rect: IntRect, seed: u8) {
        let bytes: Vec<u8> = (0..rect.byte_len(self.bpp))
            .map(|i| seed.wrapping_add((i % 251) as u8))
            .collect();
        self.put(rect, &bytes);
    }

    pub fn snapshot(&self, rect: IntRect) -> Vec<u8> {
        self.read_pixels(rect)
    }

    fn row_start(&self, x: i32, y: i32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.bpp
    }

    fn put(&self, rect: IntRect, bytes: &[u8]) {
        let row_len = rect.width as usize * self.bpp;
        let mut pixels = self.pixels.lock();
        for row in 0..rect.height as usize {
            let start = self.row_start(rect.x, rect.y + row as i32);
            pixels[start..start + row_len]
                .copy_from_slice(&bytes[row * row_len..(row + 1) * row_len]);
        }
    }
}

impl PixelLayer for TestLayer {
    fn bounds(&self) -> IntRect {
        IntRect::new(0, 0, self.width, self.height)
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bpp
    }

    fn read_pixels(&self, rect: IntRect) -> Vec<u8> {
        let row_len = rect.width as usize * self.bpp;
        let pixels = self.pixels.lock();
        let mut out = Vec::with_capacity(row_len * rect.height as usize);
        for row in 0..rect.height as usize {
            let start = self.row_start(rect.x, rect.y + row as i32);
            out.extend_from_slice(&pixels[start..start + row_len]);
        }
        out
    }

    fn write_pixels(&self, rect: IntRect, bytes: &[u8]) {
        self.put(rect, bytes);
        self.writes.lock().push(rect);
    }

    fn notify_region_changed(&self, rect: IntRect) {
        self.notified.lock().push(rect);
    }
}

/// Storage root with a controllable free-space figure.
pub struct FixedRoot {
    pub path: PathBuf,
    pub free: AtomicU64,
}

impl FixedRoot {
    pub fn new(path: impl AsRef<Path>, free: u64) -> Arc<Self> {
        Arc::new(Self {
            path: path.as_ref().to_path_buf(),
            free: AtomicU64::new(free),
        })
    }

    pub fn set_free(&self, free: u64) {
        self.free.store(free, Ordering::SeqCst);
    }
}

impl StorageRoot for FixedRoot {
    fn location(&self) -> &Path {
        &self.path
    }

    fn free_space(&self) -> io::Result<u64> {
        Ok(self.free.load(Ordering::SeqCst))
    }
}

/// Route store logs to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn config(memory_cache_size: usize) -> UndoConfig {
    UndoConfig {
        memory_cache_size,
        disk_safety_margin: 0,
        ..Default::default()
    }
}

pub fn test_store(dir: &TempDir, layer: &Arc<TestLayer>, memory_cache_size: usize) -> UndoStore {
    UndoStore::new(
        config(memory_cache_size),
        layer,
        Arc::new(VolumeRoot::new(dir.path())),
    )
    .unwrap()
}
