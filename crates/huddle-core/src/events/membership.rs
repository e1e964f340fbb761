//! Chat membership events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events describing chat membership changes.
///
/// The conferencing service mirrors chat membership from these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MembershipEvent {
    /// A chat was created with its initial participants.
    ChatCreated {
        /// The chat ID.
        chat_id: Uuid,
        /// Every participant at creation time, creator first.
        participant_ids: Vec<Uuid>,
    },
    /// A chat was deleted.
    ChatDeleted {
        /// The chat ID.
        chat_id: Uuid,
    },
    /// A participant joined.
    ParticipantAdded {
        /// The chat ID.
        chat_id: Uuid,
        /// The user who joined.
        user_id: Uuid,
        /// Their role (`admin`, `member`, `readonly`).
        role: String,
    },
    /// A participant left or was removed.
    ParticipantRemoved {
        /// The chat ID.
        chat_id: Uuid,
        /// The user who left.
        user_id: Uuid,
    },
    /// A participant's role changed.
    RoleChanged {
        /// The chat ID.
        chat_id: Uuid,
        /// The affected user.
        user_id: Uuid,
        /// Previous role.
        old_role: String,
        /// New role.
        new_role: String,
    },
}

impl MembershipEvent {
    /// The chat this event belongs to.
    pub fn chat_id(&self) -> Uuid {
        match self {
            Self::ChatCreated { chat_id, .. }
            | Self::ChatDeleted { chat_id }
            | Self::ParticipantAdded { chat_id, .. }
            | Self::ParticipantRemoved { chat_id, .. }
            | Self::RoleChanged { chat_id, .. } => *chat_id,
        }
    }
}
