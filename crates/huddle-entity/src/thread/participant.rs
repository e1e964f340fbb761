//! Thread participant entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Explicit allow-list entry; only consulted for restricted threads.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ThreadParticipant {
    /// The thread.
    pub thread_id: Uuid,
    /// The allowed user.
    pub user_id: Uuid,
    /// When the entry was added.
    pub added_at: DateTime<Utc>,
}
