//! Chat participant queries.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_entity::chat::{ChatParticipant, ChatRole};

use super::{PgTx, insert_error};
use crate::store::ParticipantTx;

#[async_trait]
impl ParticipantTx for PgTx {
    async fn lock_roster(&mut self, chat_id: Uuid) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("roster:{chat_id}"))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock roster", e))?;
        Ok(())
    }

    async fn lock_membership(&mut self, chat_id: Uuid, user_id: Uuid) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("membership:{chat_id}:{user_id}"))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock membership", e)
            })?;
        Ok(())
    }

    async fn find_participant(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ChatParticipant>> {
        sqlx::query_as::<_, ChatParticipant>(
            "SELECT * FROM chat_participants WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find participant", e))
    }

    async fn insert_participant(&mut self, participant: &ChatParticipant) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO chat_participants (chat_id, user_id, role, joined_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(participant.chat_id)
        .bind(participant.user_id)
        .bind(participant.role)
        .bind(participant.joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "Participant"))?;
        Ok(())
    }

    async fn update_participant_role(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE chat_participants SET role = $3 WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(role)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update role", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_participant(&mut self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM chat_participants WHERE chat_id = $1 AND user_id = $2")
                .bind(chat_id)
                .bind(user_id)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete participant", e)
                })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_participants(&mut self, chat_id: Uuid) -> AppResult<Vec<ChatParticipant>> {
        sqlx::query_as::<_, ChatParticipant>(
            "SELECT * FROM chat_participants WHERE chat_id = $1 ORDER BY joined_at, user_id",
        )
        .bind(chat_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list participants", e))
    }

    async fn count_admins(&mut self, chat_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_participants WHERE chat_id = $1 AND role = 'admin'",
        )
        .bind(chat_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count admins", e))
    }
}
