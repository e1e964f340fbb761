//! Chat participant entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::ChatRole;

/// Membership of one user in one chat.
///
/// `joined_at` is the watermark compared against file link upload times.
/// It is set once when the row is created and never changes with role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatParticipant {
    /// The chat.
    pub chat_id: Uuid,
    /// The user.
    pub user_id: Uuid,
    /// Role within the chat.
    pub role: ChatRole,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
}

impl ChatParticipant {
    /// Build a new participant row.
    pub fn new(chat_id: Uuid, user_id: Uuid, role: ChatRole, joined_at: DateTime<Utc>) -> Self {
        Self {
            chat_id,
            user_id,
            role,
            joined_at,
        }
    }
}
