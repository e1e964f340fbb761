//! Share link entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use huddle_core::{AppError, AppResult, ErrorKind};

/// A token that grants anonymous download of one file.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileShareLink {
    /// Unique share link identifier.
    pub id: Uuid,
    /// The shared file.
    pub file_id: Uuid,
    /// Public token (unique).
    pub token: String,
    /// Argon2 hash of the optional password.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Download cap.
    pub max_downloads: Option<i32>,
    /// Successful downloads so far.
    pub download_count: i32,
    /// The creating user.
    pub created_by: Uuid,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
    /// When the link stops working.
    pub expires_at: Option<DateTime<Utc>>,
    /// Cleared on explicit revocation.
    pub is_active: bool,
}

impl FileShareLink {
    /// Whether a password is required.
    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Whether the download cap has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.max_downloads
            .is_some_and(|max| self.download_count >= max)
    }

    /// Check revocation, expiry and cap, in that order.
    pub fn check_available(&self, now: DateTime<Utc>) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::new(
                ErrorKind::ShareLinkRevoked,
                "Share link has been revoked",
            ));
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(AppError::new(
                ErrorKind::ShareLinkExpired,
                "Share link has expired",
            ));
        }
        if self.is_exhausted() {
            return Err(AppError::new(
                ErrorKind::ShareLinkExhausted,
                "Share link download limit reached",
            ));
        }
        Ok(())
    }
}
