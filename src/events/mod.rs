//! Channel-based delivery of undo events.
//!
//! [`ChannelListener`] plugs into a store as its [`UndoListener`](crate::UndoListener)
//! and forwards every notification through a bounded channel, so an undo
//! manager on another thread can consume them.

mod channel;

pub use channel::{ChannelListener, EventReceiver, UndoEvent};
