//! Message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A chat message. Deletion is a tombstone, never a purge.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// Owning chat.
    pub chat_id: Uuid,
    /// Thread the message was posted into, if any.
    pub thread_id: Option<Uuid>,
    /// Message this one replies to, if any.
    pub parent_id: Option<Uuid>,
    /// Author.
    pub sender_id: Uuid,
    /// Body text.
    pub content: String,
    /// When it was sent.
    pub sent_at: DateTime<Utc>,
    /// When it was last edited, deleted, or restored.
    pub updated_at: Option<DateTime<Utc>>,
    /// Tombstone flag.
    pub is_deleted: bool,
    /// Per-chat monotonically increasing sequence number.
    pub seq_num: i64,
    /// File links attached to the message.
    pub file_link_ids: Vec<Uuid>,
}

impl Message {
    /// Copy of this message suitable for clients: tombstones lose their body.
    pub fn redacted(mut self) -> Self {
        if self.is_deleted {
            self.content = String::new();
            self.file_link_ids.clear();
        }
        self
    }
}
