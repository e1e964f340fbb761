//! Message queries.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_entity::message::Message;

use super::{PgTx, insert_error};
use crate::store::MessageTx;

#[async_trait]
impl MessageTx for PgTx {
    async fn insert_message(&mut self, message: &Message) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, chat_id, thread_id, parent_id, sender_id, content, sent_at, \
             updated_at, is_deleted, seq_num, file_link_ids) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(message.id)
        .bind(message.chat_id)
        .bind(message.thread_id)
        .bind(message.parent_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.sent_at)
        .bind(message.updated_at)
        .bind(message.is_deleted)
        .bind(message.seq_num)
        .bind(&message.file_link_ids)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Message"))?;
        Ok(())
    }

    async fn find_message(&mut self, message_id: Uuid) -> AppResult<Option<Message>> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find message", e))
    }

    async fn update_message(&mut self, message: &Message) -> AppResult<()> {
        sqlx::query(
            "UPDATE messages SET content = $2, updated_at = $3, is_deleted = $4 WHERE id = $1",
        )
        .bind(message.id)
        .bind(&message.content)
        .bind(message.updated_at)
        .bind(message.is_deleted)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update message", e))?;
        Ok(())
    }

    async fn list_messages(
        &mut self,
        chat_id: Uuid,
        thread_id: Option<Uuid>,
        after_seq: i64,
        limit: u64,
    ) -> AppResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages \
             WHERE chat_id = $1 AND thread_id IS NOT DISTINCT FROM $2 AND seq_num > $3 \
             ORDER BY seq_num LIMIT $4",
        )
        .bind(chat_id)
        .bind(thread_id)
        .bind(after_seq)
        .bind(limit as i64)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list messages", e))
    }
}
