//! Physical file entity model.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a physical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Available.
    Active,
    /// Tombstoned; bytes are reclaimed out of band.
    Deleted,
}

/// A stored file. Immutable after upload except for `status`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// Sanitized name used for display and downloads.
    pub filename: String,
    /// Name as supplied by the uploader.
    pub original_filename: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Path within the storage provider.
    pub storage_path: String,
    /// The uploading user.
    pub uploaded_by: Uuid,
    /// When the upload completed.
    pub uploaded_at: DateTime<Utc>,
    /// Lifecycle state.
    pub status: FileStatus,
}

impl File {
    /// Whether the file is tombstoned.
    pub fn is_deleted(&self) -> bool {
        self.status == FileStatus::Deleted
    }

    /// Storage path for a new file: `yyyy/mm/dd/{file_id}`.
    pub fn storage_path_for(file_id: Uuid, at: DateTime<Utc>) -> String {
        format!(
            "{:04}/{:02}/{:02}/{}",
            at.year(),
            at.month(),
            at.day(),
            file_id
        )
    }
}

/// Strip path components and control characters from an uploaded name.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
