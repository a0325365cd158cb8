//! # Layer Undo
//!
//! Undo history for raster layers: captures rectangular pixel regions so
//! they can be written back later, keeping recent history in a bounded
//! memory cache and spilling older history to disk.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: a rectangle of layer pixels, addressed by a stable index
//! - **Memory cache**: fixed-size ring holding the most recent payloads
//! - **Overflow file**: append-only per-store file for evicted payloads
//! - **Disk check**: free space is verified before anything is spilled
//!
//! ## Example
//!
//! ```ignore
//! use layer_undo::{IntRect, UndoConfig, UndoStore, VolumeRoot};
//! use std::sync::Arc;
//!
//! let store = UndoStore::new(
//!     UndoConfig::default(),
//!     &layer,
//!     Arc::new(VolumeRoot::temp()),
//! )?;
//!
//! // Record the region about to be painted over
//! let index = store.capture_snapshot(IntRect::new(0, 0, 64, 64), false)?;
//!
//! // ...paint...
//!
//! // Undo
//! store.restore_snapshot(index, false)?;
//! ```

pub mod cache;
pub mod error;
pub mod events;
pub mod layer;
pub mod overflow;
pub mod records;
pub mod store;
pub mod types;

// Re-exports
pub use cache::{CacheSlot, MemoryCache};
pub use error::{Result, StoreError};
pub use events::{ChannelListener, EventReceiver, UndoEvent};
pub use layer::{PixelLayer, UndoListener};
pub use overflow::{OverflowManager, StorageRoot, VolumeRoot};
pub use records::{RecordDirectory, RECORDS_PER_GROWTH};
pub use store::{UndoConfig, UndoStore};
pub use types::*;
