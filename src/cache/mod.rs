//! Fixed-capacity memory tier for recent snapshot payloads.

mod memory;

pub use memory::{CacheSlot, MemoryCache};
