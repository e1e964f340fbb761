//! Share link queries.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_entity::share::FileShareLink;

use super::{PgTx, insert_error};
use crate::store::ShareTx;

#[async_trait]
impl ShareTx for PgTx {
    async fn insert_share_link(&mut self, link: &FileShareLink) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO file_share_links (id, file_id, token, password_hash, max_downloads, \
             download_count, created_by, created_at, expires_at, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(link.id)
        .bind(link.file_id)
        .bind(&link.token)
        .bind(&link.password_hash)
        .bind(link.max_downloads)
        .bind(link.download_count)
        .bind(link.created_by)
        .bind(link.created_at)
        .bind(link.expires_at)
        .bind(link.is_active)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Share link"))?;
        Ok(())
    }

    async fn find_share_link(&mut self, share_id: Uuid) -> AppResult<Option<FileShareLink>> {
        sqlx::query_as::<_, FileShareLink>("SELECT * FROM file_share_links WHERE id = $1")
            .bind(share_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find share link", e))
    }

    async fn find_share_link_by_token(&mut self, token: &str) -> AppResult<Option<FileShareLink>> {
        sqlx::query_as::<_, FileShareLink>("SELECT * FROM file_share_links WHERE token = $1")
            .bind(token)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find share link by token", e)
            })
    }

    async fn deactivate_share_link(&mut self, share_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("UPDATE file_share_links SET is_active = FALSE WHERE id = $1")
            .bind(share_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to revoke share link", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn try_consume_download(&mut self, share_id: Uuid) -> AppResult<Option<i32>> {
        sqlx::query_scalar(
            "UPDATE file_share_links SET download_count = download_count + 1 \
             WHERE id = $1 AND (max_downloads IS NULL OR download_count < max_downloads) \
             RETURNING download_count",
        )
        .bind(share_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count download", e))
    }

    async fn list_share_links(&mut self, file_id: Uuid) -> AppResult<Vec<FileShareLink>> {
        sqlx::query_as::<_, FileShareLink>(
            "SELECT * FROM file_share_links WHERE file_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(file_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list share links", e))
    }
}
