//! Broadcast event bus for domain events.

use tokio::sync::broadcast;
use tracing::trace;

use huddle_core::config::EventConfig;
use huddle_core::events::DomainEvent;
use huddle_core::traits::EventPublisher;

/// Fans domain events out to every subscriber.
///
/// Subscribers that fall more than `buffer_size` events behind skip ahead
/// and observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Creates a bus with the configured buffer.
    pub fn new(config: &EventConfig) -> Self {
        let (sender, _) = broadcast::channel(config.buffer_size.max(1));
        Self { sender }
    }

    /// Subscribe to every future event.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(&EventConfig::default())
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: DomainEvent) {
        let id = event.id;
        // An error only means nobody is listening.
        if self.sender.send(event).is_err() {
            trace!(event_id = %id, "Event published with no subscribers");
        }
    }
}
