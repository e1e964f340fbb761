//! Per-chat access group pair.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_database::store::StoreTx;
use huddle_entity::group::{AccessGroup, ChatFileAccessGroups, GroupKind};

/// Creates and looks up a chat's `moderate_all` / `view_all` binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGroupBinding;

impl AccessGroupBinding {
    /// Create both groups and the binding row for a new chat.
    ///
    /// Must run in the transaction that inserts the chat.
    pub async fn create(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<ChatFileAccessGroups> {
        let moderate = AccessGroup::for_chat(GroupKind::ModerateAll, chat_id, now);
        let view = AccessGroup::for_chat(GroupKind::ViewAll, chat_id, now);
        tx.insert_group(&moderate).await?;
        tx.insert_group(&view).await?;

        let binding = ChatFileAccessGroups {
            chat_id,
            moderate_group_id: moderate.id,
            view_group_id: view.id,
        };
        tx.insert_binding(&binding).await?;

        debug!(
            chat_id = %chat_id,
            moderate_group = %moderate.name,
            view_group = %view.name,
            "Access groups bound"
        );
        Ok(binding)
    }

    /// Remove the binding and both groups, with their members and grants.
    ///
    /// Links placed in the chat keep their `chat_id` and fall back to
    /// uploader ownership and individual grants.
    pub async fn unbind(tx: &mut dyn StoreTx, chat_id: Uuid) -> AppResult<bool> {
        let Some(binding) = tx.delete_binding(chat_id).await? else {
            return Ok(false);
        };
        for kind in [GroupKind::ModerateAll, GroupKind::ViewAll] {
            tx.delete_group(binding.group_id(kind)).await?;
        }
        debug!(chat_id = %chat_id, "Access groups unbound");
        Ok(true)
    }

    /// Load the binding and hold it for the rest of the transaction.
    pub async fn require(tx: &mut dyn StoreTx, chat_id: Uuid) -> AppResult<ChatFileAccessGroups> {
        tx.lock_binding(chat_id).await?.ok_or_else(|| {
            AppError::not_found(format!("Chat {chat_id} has no access group binding"))
        })
    }
}
