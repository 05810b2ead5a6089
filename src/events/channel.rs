//! Event channel built on crossbeam-channel.
//!
//! Emitters never block: a dropped receiver or a full bounded channel
//! discards the event.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

use super::Event;

/// Cloneable sending half handed to the scan loop and the indexer
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Send without blocking; returns whether the event was queued
    pub fn send(&self, event: impl Into<Event>) -> bool {
        match self.inner.try_send(event.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("event channel full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl std::fmt::Debug for EventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender").field("queued", &self.inner.len()).finish()
    }
}

/// Receiving half used by the CLI and by tests
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event; `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        match self.inner.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything queued right now
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (EventSender { inner: sender }, EventReceiver { inner: receiver })
    }

    /// Bounded channel; events beyond `capacity` are dropped, not awaited
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (EventSender { inner: sender }, EventReceiver { inner: receiver })
    }
}

/// Sender whose events go nowhere
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
