//! Chat existence, participation and role guards.

use uuid::Uuid;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_database::store::StoreTx;
use huddle_entity::chat::{Chat, ChatParticipant};

/// Guards used at the top of every chat-scoped operation.
///
/// The order of checks gives callers distinct outcomes: a missing chat is
/// `NotFound`, an outsider is `NotParticipant`, and a participant without
/// the needed role is `AccessDenied`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatGuard;

impl ChatGuard {
    /// Load the chat or fail with `NotFound`.
    pub async fn require_chat(tx: &mut dyn StoreTx, chat_id: Uuid) -> AppResult<Chat> {
        tx.find_chat(chat_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Chat {chat_id} not found")))
    }

    /// Whether the user participates in the chat.
    pub async fn is_participant(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        Ok(tx.find_participant(chat_id, user_id).await?.is_some())
    }

    /// Load the user's participant row, failing with `NotParticipant`.
    pub async fn require_participant(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<ChatParticipant> {
        Self::require_chat(tx, chat_id).await?;
        tx.find_participant(chat_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_participant(format!("User {user_id} is not in chat {chat_id}"))
            })
    }

    /// Require a participant whose role can moderate.
    pub async fn require_moderator(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<ChatParticipant> {
        let participant = Self::require_participant(tx, chat_id, user_id).await?;
        if !participant.role.can_moderate() {
            return Err(AppError::new(
                ErrorKind::AccessDenied,
                "Only chat admins can perform this action",
            ));
        }
        Ok(participant)
    }
}
