//! Membership operations.
//!
//! Each change runs in one transaction that takes the chat's roster lock,
//! then the (chat, user) membership lock, then updates the participant row
//! and the chat's access groups together. The roster lock covers the admin
//! count and the participant cap, which span more than one user. A failed
//! group update drops the transaction, so the participant row is never
//! committed without its group state.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use huddle_auth::ChatGuard;
use huddle_core::error::AppError;
use huddle_core::events::{DomainEvent, EventPayload, MembershipEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_database::store::Store;
use huddle_entity::chat::{ChatParticipant, ChatRole};

use crate::chat::ActivityLog;
use crate::context::RequestContext;
use crate::propagation::GroupPermissionPropagator;

/// Adds, removes and re-roles chat participants.
#[derive(Clone)]
pub struct MembershipService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Time source for `joined_at`.
    clock: Arc<dyn Clock>,
    /// Event sink.
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for MembershipService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipService").finish()
    }
}

impl MembershipService {
    /// Creates a new membership service.
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// Add a user to a chat. Admin only.
    pub async fn add_participant(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> AppResult<ChatParticipant> {
        let mut tx = self.store.begin().await?;
        let chat = ChatGuard::require_chat(tx.as_mut(), chat_id).await?;
        tx.lock_roster(chat_id).await?;
        ChatGuard::require_moderator(tx.as_mut(), chat_id, ctx.user_id).await?;
        tx.lock_membership(chat_id, user_id).await?;

        if tx.find_participant(chat_id, user_id).await?.is_some() {
            return Err(AppError::already_exists(format!(
                "User {user_id} is already in chat {chat_id}"
            )));
        }
        if let Some(max) = chat.chat_type.max_participants() {
            if tx.list_participants(chat_id).await?.len() >= max {
                return Err(AppError::conflict(format!(
                    "This chat type holds at most {max} participants"
                )));
            }
        }

        let now = self.clock.now();
        let participant = ChatParticipant::new(chat_id, user_id, role, now);
        tx.insert_participant(&participant).await?;
        GroupPermissionPropagator::add_participant_access(tx.as_mut(), chat_id, user_id, role, now)
            .await?;
        ActivityLog::record(
            tx.as_mut(),
            chat_id,
            ctx.user_id,
            format!("{} added {user_id} as {role}", ctx.user_id),
            now,
        )
        .await?;
        tx.commit().await?;

        info!(
            chat_id = %chat_id,
            user_id = %user_id,
            role = %role,
            added_by = %ctx.user_id,
            "Participant added"
        );
        self.publish(
            ctx,
            MembershipEvent::ParticipantAdded {
                chat_id,
                user_id,
                role: role.to_string(),
            },
        );
        Ok(participant)
    }

    /// Remove a user from a chat. Admins may remove anyone; every
    /// participant may remove themself.
    ///
    /// The user's thread participant rows in the chat go with them. Their
    /// individual file grants stay.
    pub async fn remove_participant(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        ChatGuard::require_chat(tx.as_mut(), chat_id).await?;
        tx.lock_roster(chat_id).await?;
        let self_removal = ctx.is(user_id);
        if !self_removal {
            ChatGuard::require_moderator(tx.as_mut(), chat_id, ctx.user_id).await?;
        }
        tx.lock_membership(chat_id, user_id).await?;

        let target = tx
            .find_participant(chat_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("User {user_id} is not in chat {chat_id}"))
            })?;
        if target.role.can_moderate() && tx.count_admins(chat_id).await? <= 1 {
            return Err(AppError::conflict(
                "The last admin cannot leave; promote another participant or delete the chat",
            ));
        }

        let now = self.clock.now();
        tx.delete_participant(chat_id, user_id).await?;
        let dropped = tx
            .delete_thread_participants_for_user(chat_id, user_id)
            .await?;
        GroupPermissionPropagator::remove_participant_access(tx.as_mut(), chat_id, user_id)
            .await?;
        if !self_removal {
            ActivityLog::record(
                tx.as_mut(),
                chat_id,
                ctx.user_id,
                format!("{} removed {user_id}", ctx.user_id),
                now,
            )
            .await?;
        }
        tx.commit().await?;

        info!(
            chat_id = %chat_id,
            user_id = %user_id,
            removed_by = %ctx.user_id,
            thread_rows = dropped,
            "Participant removed"
        );
        self.publish(ctx, MembershipEvent::ParticipantRemoved { chat_id, user_id });
        Ok(())
    }

    /// Change a participant's role. Admin only.
    ///
    /// Becoming admin swaps the user into `moderate_all`; losing admin swaps
    /// them back into `view_all`, where the watermark applies again with
    /// their original `joined_at`. `member` and `readonly` share a group.
    pub async fn update_role(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        user_id: Uuid,
        new_role: ChatRole,
    ) -> AppResult<ChatParticipant> {
        let mut tx = self.store.begin().await?;
        tx.lock_roster(chat_id).await?;
        ChatGuard::require_moderator(tx.as_mut(), chat_id, ctx.user_id).await?;
        tx.lock_membership(chat_id, user_id).await?;

        let mut participant = tx
            .find_participant(chat_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("User {user_id} is not in chat {chat_id}"))
            })?;
        let old_role = participant.role;
        if old_role == new_role {
            return Ok(participant);
        }

        let promoting = !old_role.can_moderate() && new_role.can_moderate();
        let demoting = old_role.can_moderate() && !new_role.can_moderate();
        if demoting && tx.count_admins(chat_id).await? <= 1 {
            return Err(AppError::conflict("A chat must keep at least one admin"));
        }

        let now = self.clock.now();
        tx.update_participant_role(chat_id, user_id, new_role)
            .await?;
        if promoting {
            GroupPermissionPropagator::promote(tx.as_mut(), chat_id, user_id, now).await?;
        } else if demoting {
            GroupPermissionPropagator::demote(tx.as_mut(), chat_id, user_id, now).await?;
        }
        ActivityLog::record(
            tx.as_mut(),
            chat_id,
            ctx.user_id,
            format!("{} changed {user_id} from {old_role} to {new_role}", ctx.user_id),
            now,
        )
        .await?;
        tx.commit().await?;

        info!(
            chat_id = %chat_id,
            user_id = %user_id,
            old_role = %old_role,
            new_role = %new_role,
            updated_by = %ctx.user_id,
            "Participant role changed"
        );
        self.publish(
            ctx,
            MembershipEvent::RoleChanged {
                chat_id,
                user_id,
                old_role: old_role.to_string(),
                new_role: new_role.to_string(),
            },
        );

        participant.role = new_role;
        Ok(participant)
    }

    /// Whether the user participates in the chat.
    pub async fn is_participant(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut tx = self.store.begin().await?;
        ChatGuard::is_participant(tx.as_mut(), chat_id, user_id).await
    }

    /// IDs of every participant, earliest joiner first.
    pub async fn get_participant_ids(&self, chat_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut tx = self.store.begin().await?;
        ChatGuard::require_chat(tx.as_mut(), chat_id).await?;
        Ok(tx
            .list_participants(chat_id)
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .collect())
    }

    /// Participant rows, visible to participants only.
    pub async fn list_participants(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
    ) -> AppResult<Vec<ChatParticipant>> {
        let mut tx = self.store.begin().await?;
        ChatGuard::require_participant(tx.as_mut(), chat_id, ctx.user_id).await?;
        tx.list_participants(chat_id).await
    }

    fn publish(&self, ctx: &RequestContext, event: MembershipEvent) {
        self.events.publish(DomainEvent::new(
            self.clock.now(),
            Some(ctx.user_id),
            EventPayload::Membership(event),
        ));
    }
}
