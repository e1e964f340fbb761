//! File, file link and individual permission queries.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_entity::file::{File, FileLink, FileLinkPermission, FileStatus};

use super::{PgTx, insert_error};
use crate::store::FileTx;

#[async_trait]
impl FileTx for PgTx {
    async fn insert_file(&mut self, file: &File) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO files (id, filename, original_filename, content_type, size, storage_path, \
             uploaded_by, uploaded_at, status) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(file.id)
        .bind(&file.filename)
        .bind(&file.original_filename)
        .bind(&file.content_type)
        .bind(file.size)
        .bind(&file.storage_path)
        .bind(file.uploaded_by)
        .bind(file.uploaded_at)
        .bind(file.status)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "File"))?;
        Ok(())
    }

    async fn find_file(&mut self, file_id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    async fn update_file_status(&mut self, file_id: Uuid, status: FileStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE files SET status = $2 WHERE id = $1")
            .bind(file_id)
            .bind(status)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update file status", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_link(&mut self, link: &FileLink) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO file_links (id, file_id, chat_id, uploaded_by, uploaded_at, is_deleted) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(link.id)
        .bind(link.file_id)
        .bind(link.chat_id)
        .bind(link.uploaded_by)
        .bind(link.uploaded_at)
        .bind(link.is_deleted)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "File link"))?;
        Ok(())
    }

    async fn find_link(&mut self, link_id: Uuid) -> AppResult<Option<FileLink>> {
        sqlx::query_as::<_, FileLink>("SELECT * FROM file_links WHERE id = $1")
            .bind(link_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file link", e))
    }

    async fn mark_link_deleted(&mut self, link_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("UPDATE file_links SET is_deleted = TRUE WHERE id = $1")
            .bind(link_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete file link", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_links_for_chat(&mut self, chat_id: Uuid) -> AppResult<Vec<FileLink>> {
        sqlx::query_as::<_, FileLink>(
            "SELECT * FROM file_links WHERE chat_id = $1 AND is_deleted = FALSE \
             ORDER BY uploaded_at DESC, id",
        )
        .bind(chat_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list chat files", e))
    }

    async fn list_links_for_file(&mut self, file_id: Uuid) -> AppResult<Vec<FileLink>> {
        sqlx::query_as::<_, FileLink>(
            "SELECT * FROM file_links WHERE file_id = $1 ORDER BY uploaded_at, id",
        )
        .bind(file_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list file links", e))
    }

    async fn upsert_link_permission(&mut self, permission: &FileLinkPermission) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO file_link_permissions \
             (file_link_id, user_id, can_view, can_download, can_delete, granted_by, granted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (file_link_id, user_id) DO UPDATE SET \
             can_view = EXCLUDED.can_view, can_download = EXCLUDED.can_download, \
             can_delete = EXCLUDED.can_delete, granted_by = EXCLUDED.granted_by, \
             granted_at = EXCLUDED.granted_at",
        )
        .bind(permission.file_link_id)
        .bind(permission.user_id)
        .bind(permission.can_view)
        .bind(permission.can_download)
        .bind(permission.can_delete)
        .bind(permission.granted_by)
        .bind(permission.granted_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to grant permission", e))?;
        Ok(())
    }

    async fn find_link_permission(
        &mut self,
        link_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<FileLinkPermission>> {
        sqlx::query_as::<_, FileLinkPermission>(
            "SELECT * FROM file_link_permissions WHERE file_link_id = $1 AND user_id = $2",
        )
        .bind(link_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find permission", e))
    }

    async fn delete_link_permission(&mut self, link_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM file_link_permissions WHERE file_link_id = $1 AND user_id = $2",
        )
        .bind(link_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke permission", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_link_permissions(
        &mut self,
        link_id: Uuid,
    ) -> AppResult<Vec<FileLinkPermission>> {
        sqlx::query_as::<_, FileLinkPermission>(
            "SELECT * FROM file_link_permissions WHERE file_link_id = $1 ORDER BY granted_at, user_id",
        )
        .bind(link_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list permissions", e))
    }
}
