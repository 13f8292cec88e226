//! Event broadcasting.

use tokio::sync::broadcast;

use refdedup_core::DedupEvent;

/// Default channel buffer size for core events.
pub const EVENT_CHANNEL_SIZE: usize = 1024;

/// Receiving end of an [`EventBus`].
pub type EventReceiver = broadcast::Receiver<DedupEvent>;

/// Broadcast handle shared by the components of a run.
///
/// Sending never blocks and never fails the run: with no subscriber the
/// event is dropped, and a subscriber that falls behind sees
/// `RecvError::Lagged` instead of stalling the core.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DedupEvent>,
}

impl EventBus {
    /// Create a new bus.
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_SIZE)
    }

    /// Create a bus with a custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    /// Emit an event.
    pub fn emit(&self, event: DedupEvent) {
        let _ = self.tx.send(event);
    }

    /// Check if anybody is listening.
    pub fn has_subscribers(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
