//! Thread entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Hard cap on subthread nesting. A thread at this depth has no children.
pub const MAX_THREAD_DEPTH: i32 = 5;

/// Title of the per-chat moderator activity log thread.
pub const SYSTEM_THREAD_TITLE: &str = "Activity";

/// Title of the system thread mirroring a chat's conference.
pub const CONFERENCE_THREAD_TITLE: &str = "Conference";

/// Who authors a thread's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "thread_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ThreadType {
    /// Written by users through the normal send path.
    User,
    /// Append-only log written by the system; visible to the whole chat.
    System,
}

/// A thread inside a chat, optionally nested under another thread.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Thread {
    /// Unique thread identifier.
    pub id: Uuid,
    /// Owning chat.
    pub chat_id: Uuid,
    /// Message this thread is anchored to, if any.
    pub parent_message_id: Option<Uuid>,
    /// Parent thread, for subthreads.
    pub parent_thread_id: Option<Uuid>,
    /// User or system thread.
    pub thread_type: ThreadType,
    /// Optional title.
    pub title: Option<String>,
    /// Nesting depth: 0 at top level, parent's depth + 1 below.
    pub depth: i32,
    /// Whether access requires an explicit thread participant row.
    pub restricted_participants: bool,
    /// Number of messages posted.
    pub message_count: i64,
    /// Creating user; `None` for system-created threads.
    pub created_by: Option<Uuid>,
    /// When the thread was created.
    pub created_at: DateTime<Utc>,
    /// When the last message was posted.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Whether the thread is archived.
    pub is_archived: bool,
}

impl Thread {
    /// Build a new top-level thread.
    pub fn top_level(
        chat_id: Uuid,
        thread_type: ThreadType,
        title: Option<String>,
        created_by: Option<Uuid>,
        restricted: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            parent_message_id: None,
            parent_thread_id: None,
            thread_type,
            title,
            depth: 0,
            restricted_participants: restricted,
            message_count: 0,
            created_by,
            created_at: now,
            last_message_at: None,
            is_archived: false,
        }
    }

    /// Whether this is a system thread.
    pub fn is_system(&self) -> bool {
        self.thread_type == ThreadType::System
    }

    /// Whether a subthread may be created beneath this thread.
    pub fn can_nest(&self) -> bool {
        self.depth < MAX_THREAD_DEPTH
    }

    /// Depth a child of this thread would have.
    pub fn child_depth(&self) -> i32 {
        self.depth + 1
    }
}
