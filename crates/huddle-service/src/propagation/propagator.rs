//! Keeps group membership and group grants in step with chats.
//!
//! Two triggers: a new chat-scoped file link gets one grant per chat group,
//! and every membership change moves the user between the chat's groups.
//! A user is in exactly one of the two groups while they participate and
//! in neither afterwards. Every failure is reported as `PropagationFailure`
//! and the caller drops its transaction, so membership and group state
//! never diverge.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_database::store::StoreTx;
use huddle_entity::chat::ChatRole;
use huddle_entity::file::FileLink;
use huddle_entity::group::{FileLinkGroupPermission, GroupKind, GroupMember};

use super::binding::AccessGroupBinding;

/// Group-permission propagator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupPermissionPropagator;

impl GroupPermissionPropagator {
    /// Grant both chat groups on a newly created chat-scoped link.
    /// Standalone links are left alone.
    pub async fn on_link_created(tx: &mut dyn StoreTx, link: &FileLink) -> AppResult<()> {
        let Some(chat_id) = link.chat_id else {
            return Ok(());
        };
        Self::grant_link(tx, chat_id, link.id).await.map_err(|e| {
            AppError::propagation(format!("Failed to grant chat groups on link {}", link.id), e)
        })
    }

    /// Put a new participant into the group matching their role.
    pub async fn add_participant_access(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        Self::move_member(tx, chat_id, user_id, role.access_group(), now)
            .await
            .map_err(|e| Self::failure("add", chat_id, user_id, e))
    }

    /// Swap the user from `view_all` into `moderate_all`.
    pub async fn promote(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        Self::move_member(tx, chat_id, user_id, GroupKind::ModerateAll, now)
            .await
            .map_err(|e| Self::failure("promote", chat_id, user_id, e))
    }

    /// Swap the user from `moderate_all` back into `view_all`.
    pub async fn demote(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        Self::move_member(tx, chat_id, user_id, GroupKind::ViewAll, now)
            .await
            .map_err(|e| Self::failure("demote", chat_id, user_id, e))
    }

    /// Drop the user from both groups. Individual grants are untouched.
    pub async fn remove_participant_access(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        Self::remove_member(tx, chat_id, user_id)
            .await
            .map_err(|e| Self::failure("remove", chat_id, user_id, e))
    }

    async fn grant_link(tx: &mut dyn StoreTx, chat_id: Uuid, link_id: Uuid) -> AppResult<()> {
        let binding = AccessGroupBinding::require(tx, chat_id).await?;
        for kind in [GroupKind::ModerateAll, GroupKind::ViewAll] {
            let grant = FileLinkGroupPermission::for_group(kind, link_id, binding.group_id(kind));
            tx.insert_group_permission(&grant).await?;
        }
        debug!(chat_id = %chat_id, link_id = %link_id, "Granted chat groups on link");
        Ok(())
    }

    async fn move_member(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        user_id: Uuid,
        to: GroupKind,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let binding = AccessGroupBinding::require(tx, chat_id).await?;
        tx.delete_group_member(binding.group_id(to.other()), user_id)
            .await?;
        tx.insert_group_member(&GroupMember {
            group_id: binding.group_id(to),
            user_id,
            joined_at: now,
        })
        .await?;
        debug!(chat_id = %chat_id, user_id = %user_id, group = to.suffix(), "Moved group member");
        Ok(())
    }

    async fn remove_member(tx: &mut dyn StoreTx, chat_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let binding = AccessGroupBinding::require(tx, chat_id).await?;
        for kind in [GroupKind::ModerateAll, GroupKind::ViewAll] {
            tx.delete_group_member(binding.group_id(kind), user_id)
                .await?;
        }
        debug!(chat_id = %chat_id, user_id = %user_id, "Removed from chat groups");
        Ok(())
    }

    fn failure(action: &str, chat_id: Uuid, user_id: Uuid, cause: AppError) -> AppError {
        AppError::propagation(
            format!("Group {action} for user {user_id} in chat {chat_id} failed"),
            cause,
        )
    }
}
