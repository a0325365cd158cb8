//! Collaborators the store talks to: the layer it records and the undo
//! manager it reports to.

use crate::types::{IntRect, SnapshotIndex};

/// Pixel access to a raster layer.
///
/// Pixels are tightly packed rows of `bytes_per_pixel` bytes. Methods take
/// `&self` because restores may run on a different thread from captures;
/// implementations provide their own interior mutability.
pub trait PixelLayer: Send + Sync {
    /// Layer extent in layer space.
    fn bounds(&self) -> IntRect;

    /// Bytes per pixel of the layer's pixel format.
    fn bytes_per_pixel(&self) -> usize;

    /// Copy out the pixels of `rect`, which lies within [`bounds`](Self::bounds).
    fn read_pixels(&self, rect: IntRect) -> Vec<u8>;

    /// Overwrite the pixels of `rect` with `bytes`.
    fn write_pixels(&self, rect: IntRect, bytes: &[u8]);

    /// Called after a non-automatic restore so the owner can update and redraw.
    fn notify_region_changed(&self, rect: IntRect);
}

/// Receives notice of new undoable states.
pub trait UndoListener: Send + Sync {
    /// A non-automatic capture produced snapshot `index`.
    fn record_created(&self, index: SnapshotIndex);
}
