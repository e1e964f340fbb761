//! Chat queries.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_core::types::pagination::{PageRequest, PageResponse};
use huddle_entity::chat::Chat;

use super::{PgTx, insert_error};
use crate::store::ChatTx;

#[async_trait]
impl ChatTx for PgTx {
    async fn insert_chat(&mut self, chat: &Chat) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO chats (id, name, chat_type, created_by, created_at, updated_at, last_seq_num) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(chat.id)
        .bind(&chat.name)
        .bind(chat.chat_type)
        .bind(chat.created_by)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .bind(chat.last_seq_num)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Chat"))?;
        Ok(())
    }

    async fn find_chat(&mut self, chat_id: Uuid) -> AppResult<Option<Chat>> {
        sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1")
            .bind(chat_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find chat", e))
    }

    async fn lock_chat(&mut self, chat_id: Uuid) -> AppResult<Option<Chat>> {
        sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1 FOR UPDATE")
            .bind(chat_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock chat", e))
    }

    async fn update_chat(&mut self, chat: &Chat) -> AppResult<()> {
        sqlx::query("UPDATE chats SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(chat.id)
            .bind(&chat.name)
            .bind(chat.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update chat", e))?;
        Ok(())
    }

    async fn delete_chat(&mut self, chat_id: Uuid) -> AppResult<bool> {
        // The binding row cascades with the chat; the groups it names do not.
        let groups: Option<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT moderate_group_id, view_group_id FROM chat_file_access_groups WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find chat groups", e))?;

        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(chat_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete chat", e))?;

        if let Some((moderate, view)) = groups {
            sqlx::query("DELETE FROM access_groups WHERE id = ANY($1)")
                .bind(vec![moderate, view])
                .execute(&mut *self.tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete chat groups", e)
                })?;
        }

        Ok(result.rows_affected() > 0)
    }

    async fn list_chats_for_user(
        &mut self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Chat>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_participants WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count chats", e)
                })?;

        let chats = sqlx::query_as::<_, Chat>(
            "SELECT c.* FROM chats c \
             JOIN chat_participants p ON p.chat_id = c.id \
             WHERE p.user_id = $1 \
             ORDER BY c.updated_at DESC, c.id LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list chats", e))?;

        Ok(PageResponse::new(
            chats,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn next_seq_num(&mut self, chat_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar(
            "UPDATE chats SET last_seq_num = last_seq_num + 1 WHERE id = $1 RETURNING last_seq_num",
        )
        .bind(chat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to allocate sequence number", e)
        })?
        .ok_or_else(|| AppError::not_found(format!("Chat {chat_id} not found")))
    }
}
