//! The `ChatFileAccessGroups` binding row.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::model::GroupKind;

/// Ties a chat to its `moderate_all` and `view_all` groups. One per chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChatFileAccessGroups {
    /// The chat (unique).
    pub chat_id: Uuid,
    /// The `moderate_all` group.
    pub moderate_group_id: Uuid,
    /// The `view_all` group.
    pub view_group_id: Uuid,
}

impl ChatFileAccessGroups {
    /// Group id for `kind`.
    pub fn group_id(&self, kind: GroupKind) -> Uuid {
        match kind {
            GroupKind::ModerateAll => self.moderate_group_id,
            GroupKind::ViewAll => self.view_group_id,
        }
    }
}
