//! Message events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to chat messages; clients sync by `seq_num`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageEvent {
    /// A message was sent.
    Sent {
        /// The chat ID.
        chat_id: Uuid,
        /// The thread, if any.
        thread_id: Option<Uuid>,
        /// The message ID.
        message_id: Uuid,
        /// Per-chat sequence number.
        seq_num: i64,
    },
    /// A message was edited, deleted, or restored.
    Updated {
        /// The chat ID.
        chat_id: Uuid,
        /// The message ID.
        message_id: Uuid,
        /// Whether the message is now a tombstone.
        is_deleted: bool,
    },
}

impl MessageEvent {
    /// The chat this event belongs to.
    pub fn chat_id(&self) -> Uuid {
        match self {
            Self::Sent { chat_id, .. } | Self::Updated { chat_id, .. } => *chat_id,
        }
    }
}
