//! Bounded channel listener.

use crate::layer::UndoListener;
use crate::types::SnapshotIndex;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default number of undelivered events held before new ones are dropped.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Events emitted by a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UndoEvent {
    /// A new undoable snapshot exists.
    RecordCreated(SnapshotIndex),
}

/// [`UndoListener`] that forwards events into a bounded channel.
///
/// Never blocks the store: events that do not fit in the buffer are
/// dropped and counted.
pub struct ChannelListener {
    sender: Sender<UndoEvent>,
    dropped: AtomicU64,
}

impl ChannelListener {
    /// Create a listener with the default buffer size.
    pub fn new() -> (Self, EventReceiver) {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> (Self, EventReceiver) {
        let (sender, receiver) = bounded(buffer_size.max(1));
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            EventReceiver { receiver },
        )
    }

    /// Events lost to a full buffer or a closed receiver.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, event: UndoEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "undo event buffer full, dropping event");
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl UndoListener for ChannelListener {
    fn record_created(&self, index: SnapshotIndex) {
        self.send(UndoEvent::RecordCreated(index));
    }
}

/// Receiving end of a [`ChannelListener`].
pub struct EventReceiver {
    receiver: Receiver<UndoEvent>,
}

impl EventReceiver {
    /// Block until an event arrives.
    pub fn recv(&self) -> Result<UndoEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<UndoEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<UndoEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<UndoEvent> {
        self.receiver.try_iter().collect()
    }
}
