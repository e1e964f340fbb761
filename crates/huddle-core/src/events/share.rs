//! Share-related domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to public share links.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShareEvent {
    /// A share link was created.
    Created {
        /// The share link ID.
        share_id: Uuid,
        /// The shared file.
        file_id: Uuid,
    },
    /// A shared file was downloaded.
    Downloaded {
        /// The share link ID.
        share_id: Uuid,
        /// Download count after this download.
        download_count: i32,
        /// Maximum downloads allowed (if set).
        max_downloads: Option<i32>,
    },
    /// A share link was revoked.
    Revoked {
        /// The share link ID.
        share_id: Uuid,
    },
}
