//! File link entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A placement of a physical file: standalone, or inside a chat.
///
/// `chat_id` is a weak reference. Deleting the chat leaves the link (and
/// its history) in place but removes every group-derived grant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileLink {
    /// Unique link identifier.
    pub id: Uuid,
    /// The physical file.
    pub file_id: Uuid,
    /// The chat this link lives in; `None` for standalone links.
    pub chat_id: Option<Uuid>,
    /// The user who created the link. Owns it permanently.
    pub uploaded_by: Uuid,
    /// When the link was created; the second side of the join watermark.
    pub uploaded_at: DateTime<Utc>,
    /// Tombstone flag for this placement only.
    pub is_deleted: bool,
}

impl FileLink {
    /// Build a new link row.
    pub fn new(
        file_id: Uuid,
        chat_id: Option<Uuid>,
        uploaded_by: Uuid,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_id,
            chat_id,
            uploaded_by,
            uploaded_at,
            is_deleted: false,
        }
    }

    /// Whether the link lives outside any chat.
    pub fn is_standalone(&self) -> bool {
        self.chat_id.is_none()
    }
}
