//! Event publishing seam between services and the event bus.

use crate::events::DomainEvent;

/// Sink for domain events.
///
/// Publishing is fire-and-forget: services call it only after their
/// transaction has committed, and a publish with no listeners is not an
/// error.
pub trait EventPublisher: Send + Sync + std::fmt::Debug + 'static {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: DomainEvent);
}
