//! Chat lifecycle: create, read, list, rename, delete.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use huddle_auth::ChatGuard;
use huddle_core::error::AppError;
use huddle_core::events::{DomainEvent, EventPayload, MembershipEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_core::types::pagination::{PageRequest, PageResponse};
use huddle_database::store::Store;
use huddle_entity::chat::model::validate_name;
use huddle_entity::chat::{Chat, ChatParticipant, ChatRole, ChatType};
use huddle_entity::thread::{SYSTEM_THREAD_TITLE, Thread, ThreadType};

use crate::context::RequestContext;
use crate::propagation::{AccessGroupBinding, GroupPermissionPropagator};

/// Parameters for creating a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChatRequest {
    /// Display name.
    pub name: String,
    /// Chat type.
    pub chat_type: ChatType,
    /// Users to add as members alongside the creator.
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

/// Creates and manages chats.
#[derive(Clone)]
pub struct ChatService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Event sink.
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService").finish()
    }
}

impl ChatService {
    /// Creates a new chat service.
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

    /// Create a chat with its creator as admin, its access group binding,
    /// its initial members and its activity thread, all in one transaction.
    pub async fn create_chat(
        &self,
        ctx: &RequestContext,
        req: CreateChatRequest,
    ) -> AppResult<Chat> {
        validate_name("Chat name", &req.name)?;

        let mut member_ids: Vec<Uuid> = Vec::with_capacity(req.member_ids.len());
        for id in req.member_ids {
            if id != ctx.user_id && !member_ids.contains(&id) {
                member_ids.push(id);
            }
        }
        if let Some(max) = req.chat_type.max_participants() {
            if member_ids.len() + 1 > max {
                return Err(AppError::validation(format!(
                    "This chat type holds at most {max} participants"
                )));
            }
        }

        let now = self.clock.now();
        let chat = Chat::new(req.name.trim().to_string(), req.chat_type, ctx.user_id, now);

        let mut tx = self.store.begin().await?;
        tx.insert_chat(&chat).await?;
        AccessGroupBinding::create(tx.as_mut(), chat.id, now)
            .await
            .map_err(|e| AppError::propagation("Failed to bind chat access groups", e))?;

        let creator = ChatParticipant::new(chat.id, ctx.user_id, ChatRole::Admin, now);
        tx.insert_participant(&creator).await?;
        GroupPermissionPropagator::add_participant_access(
            tx.as_mut(),
            chat.id,
            ctx.user_id,
            ChatRole::Admin,
            now,
        )
        .await?;

        for user_id in &member_ids {
            let member = ChatParticipant::new(chat.id, *user_id, ChatRole::Member, now);
            tx.insert_participant(&member).await?;
            GroupPermissionPropagator::add_participant_access(
                tx.as_mut(),
                chat.id,
                *user_id,
                ChatRole::Member,
                now,
            )
            .await?;
        }

        let activity = Thread::top_level(
            chat.id,
            ThreadType::System,
            Some(SYSTEM_THREAD_TITLE.to_string()),
            None,
            false,
            now,
        );
        tx.insert_thread(&activity).await?;
        tx.commit().await?;

        info!(
            chat_id = %chat.id,
            created_by = %ctx.user_id,
            members = member_ids.len(),
            "Chat created"
        );

        let mut participant_ids = Vec::with_capacity(member_ids.len() + 1);
        participant_ids.push(ctx.user_id);
        participant_ids.extend(member_ids);
        self.events.publish(DomainEvent::new(
            now,
            Some(ctx.user_id),
            EventPayload::Membership(MembershipEvent::ChatCreated {
                chat_id: chat.id,
                participant_ids,
            }),
        ));

        Ok(chat)
    }

    /// Load a chat the actor participates in.
    pub async fn get_chat(&self, ctx: &RequestContext, chat_id: Uuid) -> AppResult<Chat> {
        let mut tx = self.store.begin().await?;
        let chat = ChatGuard::require_chat(tx.as_mut(), chat_id).await?;
        ChatGuard::require_participant(tx.as_mut(), chat_id, ctx.user_id).await?;
        Ok(chat)
    }

    /// Chats the actor participates in, most recently updated first.
    pub async fn list_chats(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Chat>> {
        let mut tx = self.store.begin().await?;
        tx.list_chats_for_user(ctx.user_id, page).await
    }

    /// Rename a chat. Admin only.
    pub async fn rename_chat(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        name: &str,
    ) -> AppResult<Chat> {
        validate_name("Chat name", name)?;

        let mut tx = self.store.begin().await?;
        let mut chat = ChatGuard::require_chat(tx.as_mut(), chat_id).await?;
        ChatGuard::require_moderator(tx.as_mut(), chat_id, ctx.user_id).await?;

        chat.name = name.trim().to_string();
        chat.updated_at = self.clock.now();
        tx.update_chat(&chat).await?;
        tx.commit().await?;

        info!(chat_id = %chat_id, user_id = %ctx.user_id, "Chat renamed");
        Ok(chat)
    }

    /// Delete a chat and everything scoped to it. Admin only.
    ///
    /// File links placed in the chat survive with their `chat_id`; they
    /// lose every group grant along with the groups.
    pub async fn delete_chat(&self, ctx: &RequestContext, chat_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        tx.lock_chat(chat_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Chat {chat_id} not found")))?;
        ChatGuard::require_moderator(tx.as_mut(), chat_id, ctx.user_id).await?;

        AccessGroupBinding::unbind(tx.as_mut(), chat_id).await?;
        tx.delete_chat(chat_id).await?;
        tx.commit().await?;

        info!(chat_id = %chat_id, user_id = %ctx.user_id, "Chat deleted");
        self.events.publish(DomainEvent::new(
            self.clock.now(),
            Some(ctx.user_id),
            EventPayload::Membership(MembershipEvent::ChatDeleted { chat_id }),
        ));
        Ok(())
    }
}
