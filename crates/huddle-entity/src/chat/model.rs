//! Chat entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Longest accepted chat name or thread title, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Kind of chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "chat_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// One-to-one conversation; at most two participants.
    Private,
    /// Multi-user conversation.
    Group,
    /// Broadcast-style conversation.
    Channel,
}

impl ChatType {
    /// Participant cap for this chat type, if any.
    pub fn max_participants(&self) -> Option<usize> {
        match self {
            Self::Private => Some(2),
            Self::Group | Self::Channel => None,
        }
    }
}

/// A chat.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chat {
    /// Unique chat identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Kind of chat.
    pub chat_type: ChatType,
    /// The creating user.
    pub created_by: Uuid,
    /// When the chat was created.
    pub created_at: DateTime<Utc>,
    /// When the chat was last modified.
    pub updated_at: DateTime<Utc>,
    /// Highest message sequence number allocated so far.
    pub last_seq_num: i64,
}

impl Chat {
    /// Build a new chat row.
    pub fn new(name: String, chat_type: ChatType, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            chat_type,
            created_by,
            created_at: now,
            updated_at: now,
            last_seq_num: 0,
        }
    }
}

/// Validate a chat name or thread title.
pub fn validate_name(kind: &str, name: &str) -> Result<(), huddle_core::AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(huddle_core::AppError::validation(format!(
            "{kind} must not be empty"
        )));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(huddle_core::AppError::validation(format!(
            "{kind} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}
