//! File-related domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to files and file links.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileEvent {
    /// A file link was created by upload or forward.
    Linked {
        /// The physical file.
        file_id: Uuid,
        /// The new link.
        link_id: Uuid,
        /// The chat it was placed in, if any.
        chat_id: Option<Uuid>,
        /// Original filename.
        filename: String,
        /// Size in bytes.
        size: i64,
    },
    /// A link (and possibly its file) was tombstoned.
    Deleted {
        /// The physical file.
        file_id: Uuid,
        /// The deleted link.
        link_id: Uuid,
        /// The chat of the link, if any.
        chat_id: Option<Uuid>,
        /// Whether the physical file was tombstoned as well.
        file_tombstoned: bool,
    },
}

impl FileEvent {
    /// The chat this event belongs to, if any.
    pub fn chat_id(&self) -> Option<Uuid> {
        match self {
            Self::Linked { chat_id, .. } | Self::Deleted { chat_id, .. } => *chat_id,
        }
    }
}
