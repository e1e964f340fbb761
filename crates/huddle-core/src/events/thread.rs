//! Thread events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThreadEvent {
    /// A thread or subthread was created.
    Created {
        /// The owning chat.
        chat_id: Uuid,
        /// The thread ID.
        thread_id: Uuid,
        /// Parent thread, for subthreads.
        parent_thread_id: Option<Uuid>,
        /// Nesting depth.
        depth: i32,
    },
    /// A thread was archived.
    Archived {
        /// The owning chat.
        chat_id: Uuid,
        /// The thread ID.
        thread_id: Uuid,
    },
}

impl ThreadEvent {
    /// The chat this event belongs to.
    pub fn chat_id(&self) -> Uuid {
        match self {
            Self::Created { chat_id, .. } | Self::Archived { chat_id, .. } => *chat_id,
        }
    }
}
