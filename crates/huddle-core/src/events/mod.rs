//! Domain events emitted by Huddle operations.
//!
//! Events are published on the event bus after the emitting transaction
//! commits, and are consumed by chat UIs and the conferencing service.

pub mod file;
pub mod membership;
pub mod message;
pub mod share;
pub mod thread;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use file::FileEvent;
pub use membership::MembershipEvent;
pub use message::MessageEvent;
pub use share::ShareEvent;
pub use thread::ThreadEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if applicable).
    pub actor_id: Option<Uuid>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A chat membership event.
    Membership(MembershipEvent),
    /// A thread event.
    Thread(ThreadEvent),
    /// A message event.
    Message(MessageEvent),
    /// A file event.
    File(FileEvent),
    /// A share link event.
    Share(ShareEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(timestamp: DateTime<Utc>, actor_id: Option<Uuid>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            actor_id,
            payload,
        }
    }

    /// The chat this event concerns, if it is chat-scoped.
    pub fn chat_id(&self) -> Option<Uuid> {
        match &self.payload {
            EventPayload::Membership(e) => Some(e.chat_id()),
            EventPayload::Thread(e) => Some(e.chat_id()),
            EventPayload::Message(e) => Some(e.chat_id()),
            EventPayload::File(e) => e.chat_id(),
            EventPayload::Share(_) => None,
        }
    }
}
