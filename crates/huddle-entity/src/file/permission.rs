//! Individual per-user grants on a file link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use huddle_core::AccessLevel;

/// An explicit grant to one user on one link.
///
/// These outlive chat membership: leaving a chat never removes them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileLinkPermission {
    /// The link.
    pub file_link_id: Uuid,
    /// The grantee.
    pub user_id: Uuid,
    /// May read metadata.
    pub can_view: bool,
    /// May stream content.
    pub can_download: bool,
    /// May delete and grant.
    pub can_delete: bool,
    /// Who granted it; `None` for the uploader's implicit row.
    pub granted_by: Option<Uuid>,
    /// When it was granted or last changed.
    pub granted_at: DateTime<Utc>,
}

impl FileLinkPermission {
    /// Full rights for the link's uploader.
    pub fn owner(file_link_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            file_link_id,
            user_id,
            can_view: true,
            can_download: true,
            can_delete: true,
            granted_by: None,
            granted_at: now,
        }
    }

    /// Highest level these flags grant.
    pub fn level(&self) -> AccessLevel {
        AccessLevel::from_flags(self.can_view, self.can_download, self.can_delete)
    }

    /// Level available through the fallback path, which never reaches `delete`
    /// (a `can_delete` row is honoured earlier in resolution).
    pub fn fallback_level(&self) -> AccessLevel {
        AccessLevel::from_flags(self.can_view, self.can_download, false)
    }
}

/// Requested flags for a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFlags {
    /// May read metadata.
    pub can_view: bool,
    /// May stream content.
    pub can_download: bool,
    /// May delete and grant.
    pub can_delete: bool,
}

impl GrantFlags {
    /// Flags granting up to and including `level`.
    pub fn up_to(level: AccessLevel) -> Self {
        Self {
            can_view: level >= AccessLevel::View,
            can_download: level >= AccessLevel::Download,
            can_delete: level >= AccessLevel::Delete,
        }
    }
}
