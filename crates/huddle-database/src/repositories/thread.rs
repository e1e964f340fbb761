//! Thread and thread participant queries.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_entity::thread::{Thread, ThreadParticipant};

use super::{PgTx, insert_error};
use crate::store::ThreadTx;

#[async_trait]
impl ThreadTx for PgTx {
    async fn insert_thread(&mut self, thread: &Thread) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO threads (id, chat_id, parent_message_id, parent_thread_id, thread_type, title, \
             depth, restricted_participants, message_count, created_by, created_at, last_message_at, is_archived) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(thread.id)
        .bind(thread.chat_id)
        .bind(thread.parent_message_id)
        .bind(thread.parent_thread_id)
        .bind(thread.thread_type)
        .bind(&thread.title)
        .bind(thread.depth)
        .bind(thread.restricted_participants)
        .bind(thread.message_count)
        .bind(thread.created_by)
        .bind(thread.created_at)
        .bind(thread.last_message_at)
        .bind(thread.is_archived)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Thread"))?;
        Ok(())
    }

    async fn find_thread(&mut self, thread_id: Uuid) -> AppResult<Option<Thread>> {
        sqlx::query_as::<_, Thread>("SELECT * FROM threads WHERE id = $1")
            .bind(thread_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find thread", e))
    }

    async fn update_thread(&mut self, thread: &Thread) -> AppResult<()> {
        sqlx::query(
            "UPDATE threads SET title = $2, message_count = $3, last_message_at = $4, is_archived = $5 \
             WHERE id = $1",
        )
        .bind(thread.id)
        .bind(&thread.title)
        .bind(thread.message_count)
        .bind(thread.last_message_at)
        .bind(thread.is_archived)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update thread", e))?;
        Ok(())
    }

    async fn list_threads(
        &mut self,
        chat_id: Uuid,
        parent: Option<Uuid>,
    ) -> AppResult<Vec<Thread>> {
        sqlx::query_as::<_, Thread>(
            "SELECT * FROM threads \
             WHERE chat_id = $1 AND parent_thread_id IS NOT DISTINCT FROM $2 \
             ORDER BY last_message_at DESC NULLS LAST, created_at DESC, id",
        )
        .bind(chat_id)
        .bind(parent)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list threads", e))
    }

    async fn find_system_thread(
        &mut self,
        chat_id: Uuid,
        title: &str,
    ) -> AppResult<Option<Thread>> {
        sqlx::query_as::<_, Thread>(
            "SELECT * FROM threads WHERE chat_id = $1 AND thread_type = 'system' AND title = $2 \
             ORDER BY created_at LIMIT 1",
        )
        .bind(chat_id)
        .bind(title)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find system thread", e)
        })
    }

    async fn insert_thread_participant(
        &mut self,
        participant: &ThreadParticipant,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO thread_participants (thread_id, user_id, added_at) VALUES ($1, $2, $3) \
             ON CONFLICT (thread_id, user_id) DO NOTHING",
        )
        .bind(participant.thread_id)
        .bind(participant.user_id)
        .bind(participant.added_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Thread participant"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_thread_participant(
        &mut self,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM thread_participants WHERE thread_id = $1 AND user_id = $2")
                .bind(thread_id)
                .bind(user_id)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to delete thread participant",
                        e,
                    )
                })?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_thread_participant(&mut self, thread_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM thread_participants WHERE thread_id = $1 AND user_id = $2)",
        )
        .bind(thread_id)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check thread participant", e)
        })
    }

    async fn list_thread_participants(
        &mut self,
        thread_id: Uuid,
    ) -> AppResult<Vec<ThreadParticipant>> {
        sqlx::query_as::<_, ThreadParticipant>(
            "SELECT * FROM thread_participants WHERE thread_id = $1 ORDER BY added_at, user_id",
        )
        .bind(thread_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list thread participants", e)
        })
    }

    async fn delete_thread_participants_for_user(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM thread_participants tp USING threads t \
             WHERE tp.thread_id = t.id AND t.chat_id = $1 AND tp.user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to clear thread participants", e)
        })?;
        Ok(result.rows_affected())
    }
}
