//! Group-level grants on a file link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use huddle_core::AccessLevel;

use super::model::GroupKind;

/// A grant to every member of a group on one link.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileLinkGroupPermission {
    /// The link.
    pub file_link_id: Uuid,
    /// The group.
    pub group_id: Uuid,
    /// May read metadata.
    pub can_view: bool,
    /// May stream content.
    pub can_download: bool,
    /// May delete.
    pub can_delete: bool,
    /// Grant is inert before this instant when set.
    pub valid_from: Option<DateTime<Utc>>,
}

impl FileLinkGroupPermission {
    /// The row the propagator writes for a chat group on a new link.
    pub fn for_group(kind: GroupKind, file_link_id: Uuid, group_id: Uuid) -> Self {
        let moderate = kind == GroupKind::ModerateAll;
        Self {
            file_link_id,
            group_id,
            can_view: true,
            can_download: true,
            can_delete: moderate,
            valid_from: None,
        }
    }

    /// Whether the grant applies at `now`.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| from <= now)
    }

    /// Highest level these flags grant.
    pub fn level(&self) -> AccessLevel {
        AccessLevel::from_flags(self.can_view, self.can_download, self.can_delete)
    }
}
