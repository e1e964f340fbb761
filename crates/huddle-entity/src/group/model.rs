//! Generic access group model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Which of a chat's two managed groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Unconditional `delete` on every chat file.
    ModerateAll,
    /// Watermarked `download` on chat files.
    ViewAll,
}

impl GroupKind {
    /// Suffix used in the deterministic group name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::ModerateAll => "moderate_all",
            Self::ViewAll => "view_all",
        }
    }

    /// The other group of the pair.
    pub fn other(&self) -> Self {
        match self {
            Self::ModerateAll => Self::ViewAll,
            Self::ViewAll => Self::ModerateAll,
        }
    }

    /// Deterministic name for this chat's group, e.g. `chat_{id}_view_all`.
    pub fn group_name(&self, chat_id: Uuid) -> String {
        format!("chat_{}_{}", chat_id, self.suffix())
    }
}

/// A named group of users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessGroup {
    /// Unique group identifier.
    pub id: Uuid,
    /// Group name.
    pub name: String,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
}

impl AccessGroup {
    /// Build the managed group of `kind` for a chat.
    pub fn for_chat(kind: GroupKind, chat_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: kind.group_name(chat_id),
            created_at: now,
        }
    }
}

/// Membership of a user in a group.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    /// The group.
    pub group_id: Uuid,
    /// The member.
    pub user_id: Uuid,
    /// When the user entered this group.
    pub joined_at: DateTime<Utc>,
}
