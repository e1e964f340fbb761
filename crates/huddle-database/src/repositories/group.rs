//! Access group, binding and group permission queries.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_entity::group::{AccessGroup, ChatFileAccessGroups, FileLinkGroupPermission, GroupMember};

use super::{PgTx, insert_error};
use crate::store::GroupTx;

#[async_trait]
impl GroupTx for PgTx {
    async fn insert_group(&mut self, group: &AccessGroup) -> AppResult<()> {
        sqlx::query("INSERT INTO access_groups (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(group.id)
            .bind(&group.name)
            .bind(group.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| insert_error(e, "Access group"))?;
        Ok(())
    }

    async fn delete_group(&mut self, group_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM access_groups WHERE id = $1")
            .bind(group_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete group", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_binding(&mut self, binding: &ChatFileAccessGroups) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO chat_file_access_groups (chat_id, moderate_group_id, view_group_id) \
             VALUES ($1, $2, $3)",
        )
        .bind(binding.chat_id)
        .bind(binding.moderate_group_id)
        .bind(binding.view_group_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Chat access group binding"))?;
        Ok(())
    }

    async fn delete_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>> {
        sqlx::query_as::<_, ChatFileAccessGroups>(
            "DELETE FROM chat_file_access_groups WHERE chat_id = $1 RETURNING *",
        )
        .bind(chat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete binding", e))
    }

    async fn find_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>> {
        sqlx::query_as::<_, ChatFileAccessGroups>(
            "SELECT * FROM chat_file_access_groups WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find binding", e))
    }

    async fn lock_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>> {
        sqlx::query_as::<_, ChatFileAccessGroups>(
            "SELECT * FROM chat_file_access_groups WHERE chat_id = $1 FOR SHARE",
        )
        .bind(chat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock binding", e))
    }

    async fn insert_group_member(&mut self, member: &GroupMember) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO group_members (group_id, user_id, joined_at) VALUES ($1, $2, $3) \
             ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(member.group_id)
        .bind(member.user_id)
        .bind(member.joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Group member"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_group_member(&mut self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to remove group member", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_group_member(&mut self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check group membership", e)
        })
    }

    async fn list_group_members(&mut self, group_id: Uuid) -> AppResult<Vec<GroupMember>> {
        sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE group_id = $1 ORDER BY joined_at, user_id",
        )
        .bind(group_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list group members", e))
    }

    async fn insert_group_permission(
        &mut self,
        permission: &FileLinkGroupPermission,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO file_link_group_permissions \
             (file_link_id, group_id, can_view, can_download, can_delete, valid_from) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(permission.file_link_id)
        .bind(permission.group_id)
        .bind(permission.can_view)
        .bind(permission.can_download)
        .bind(permission.can_delete)
        .bind(permission.valid_from)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Group permission"))?;
        Ok(())
    }

    async fn list_group_permissions(
        &mut self,
        link_id: Uuid,
    ) -> AppResult<Vec<FileLinkGroupPermission>> {
        sqlx::query_as::<_, FileLinkGroupPermission>(
            "SELECT * FROM file_link_group_permissions WHERE file_link_id = $1",
        )
        .bind(link_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list group permissions", e)
        })
    }
}
