//! Sending, syncing, editing and soft-deleting messages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use huddle_auth::{ChatGuard, PermissionResolver};
use huddle_core::error::{AppError, ErrorKind};
use huddle_core::events::{DomainEvent, EventPayload, MessageEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_core::AccessLevel;
use huddle_database::store::{Store, StoreTx};
use huddle_entity::chat::ChatParticipant;
use huddle_entity::message::Message;

use super::timeline::{self, Draft};
use crate::context::RequestContext;
use crate::thread::access::{load_thread, require_thread_access};

/// Largest page returned by [`MessageService::list_messages`].
pub const MAX_SYNC_BATCH: u64 = 200;

/// Parameters for sending a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Target chat.
    pub chat_id: Uuid,
    /// Target thread; `None` posts to the main timeline.
    pub thread_id: Option<Uuid>,
    /// Message being replied to.
    pub parent_id: Option<Uuid>,
    /// Body text.
    pub content: String,
    /// Attached file links.
    #[serde(default)]
    pub file_link_ids: Vec<Uuid>,
}

/// Message operations.
#[derive(Clone)]
pub struct MessageService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Event sink.
    events: Arc<dyn EventPublisher>,
    /// Checks attachments.
    resolver: Arc<PermissionResolver>,
}

impl std::fmt::Debug for MessageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageService").finish()
    }
}

impl MessageService {
    /// Creates a new message service.
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventPublisher>,
        resolver: Arc<PermissionResolver>,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            resolver,
        }
    }

    /// Post a message to a chat or one of its threads.
    ///
    /// Check order: chat exists, sender participates, thread belongs to the
    /// chat, thread is not a system thread, thread is not archived, sender
    /// may post, sender can read the thread, sender can view every attachment.
    pub async fn send_message(
        &self,
        ctx: &RequestContext,
        req: SendMessageRequest,
    ) -> AppResult<Message> {
        let mut file_link_ids: Vec<Uuid> = Vec::with_capacity(req.file_link_ids.len());
        for id in req.file_link_ids {
            if !file_link_ids.contains(&id) {
                file_link_ids.push(id);
            }
        }
        if req.content.trim().is_empty() && file_link_ids.is_empty() {
            return Err(AppError::validation("A message needs content or an attachment"));
        }

        let mut tx = self.store.begin().await?;
        let participant =
            ChatGuard::require_participant(tx.as_mut(), req.chat_id, ctx.user_id).await?;

        let thread = match req.thread_id {
            Some(thread_id) => {
                let thread = load_thread(tx.as_mut(), thread_id).await?;
                if thread.chat_id != req.chat_id {
                    return Err(AppError::not_found(format!(
                        "Thread {thread_id} not found in chat {}",
                        req.chat_id
                    )));
                }
                if thread.is_system() {
                    return Err(AppError::read_only_thread(format!(
                        "Thread {thread_id} is a system thread"
                    )));
                }
                if thread.is_archived {
                    return Err(AppError::conflict(format!("Thread {thread_id} is archived")));
                }
                Some(thread)
            }
            None => None,
        };

        if !participant.role.can_post() {
            return Err(AppError::new(
                ErrorKind::AccessDenied,
                "Read-only participants cannot post",
            ));
        }
        if let Some(thread) = &thread {
            require_thread_access(tx.as_mut(), thread, ctx.user_id).await?;
        }

        if let Some(parent_id) = req.parent_id {
            let belongs = tx
                .find_message(parent_id)
                .await?
                .is_some_and(|m| m.chat_id == req.chat_id);
            if !belongs {
                return Err(AppError::not_found(format!("Message {parent_id} not found")));
            }
        }

        for link_id in &file_link_ids {
            self.require_attachable(tx.as_mut(), *link_id, ctx.user_id)
                .await?;
        }

        let now = self.clock.now();
        let draft = Draft {
            chat_id: req.chat_id,
            thread,
            parent_id: req.parent_id,
            sender_id: ctx.user_id,
            content: req.content,
            file_link_ids,
        };
        let message = timeline::append(tx.as_mut(), draft, now).await?;
        tx.commit().await?;

        debug!(
            chat_id = %message.chat_id,
            message_id = %message.id,
            seq_num = message.seq_num,
            "Message sent"
        );
        self.events.publish(DomainEvent::new(
            now,
            Some(ctx.user_id),
            EventPayload::Message(MessageEvent::Sent {
                chat_id: message.chat_id,
                thread_id: message.thread_id,
                message_id: message.id,
                seq_num: message.seq_num,
            }),
        ));
        Ok(message)
    }

    /// Messages after `after_seq`, ascending. Deleted messages come back as
    /// tombstones with their content stripped.
    pub async fn list_messages(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        thread_id: Option<Uuid>,
        after_seq: i64,
        limit: u64,
    ) -> AppResult<Vec<Message>> {
        let mut tx = self.store.begin().await?;
        ChatGuard::require_participant(tx.as_mut(), chat_id, ctx.user_id).await?;
        if let Some(thread_id) = thread_id {
            let thread = load_thread(tx.as_mut(), thread_id).await?;
            if thread.chat_id != chat_id {
                return Err(AppError::not_found(format!(
                    "Thread {thread_id} not found in chat {chat_id}"
                )));
            }
            require_thread_access(tx.as_mut(), &thread, ctx.user_id).await?;
        }

        let limit = limit.clamp(1, MAX_SYNC_BATCH);
        Ok(tx
            .list_messages(chat_id, thread_id, after_seq, limit)
            .await?
            .into_iter()
            .map(Message::redacted)
            .collect())
    }

    /// Replace a message's content. Sender only.
    pub async fn edit_message(
        &self,
        ctx: &RequestContext,
        message_id: Uuid,
        content: String,
    ) -> AppResult<Message> {
        if content.trim().is_empty() {
            return Err(AppError::validation("Message content must not be empty"));
        }

        let mut tx = self.store.begin().await?;
        let (mut message, _) = self.load_for_actor(tx.as_mut(), message_id, ctx).await?;
        if message.sender_id != ctx.user_id {
            return Err(AppError::new(
                ErrorKind::AccessDenied,
                "Only the sender can edit a message",
            ));
        }
        if message.is_deleted {
            return Err(AppError::conflict("Deleted messages cannot be edited"));
        }

        message.content = content;
        message.updated_at = Some(self.clock.now());
        tx.update_message(&message).await?;
        tx.commit().await?;

        self.publish_update(ctx, &message);
        Ok(message)
    }

    /// Soft-delete a message. Sender or chat admin.
    pub async fn delete_message(&self, ctx: &RequestContext, message_id: Uuid) -> AppResult<Message> {
        self.set_deleted(ctx, message_id, true).await
    }

    /// Undo a soft delete. Sender or chat admin.
    pub async fn restore_message(
        &self,
        ctx: &RequestContext,
        message_id: Uuid,
    ) -> AppResult<Message> {
        self.set_deleted(ctx, message_id, false).await
    }

    async fn set_deleted(
        &self,
        ctx: &RequestContext,
        message_id: Uuid,
        deleted: bool,
    ) -> AppResult<Message> {
        let mut tx = self.store.begin().await?;
        let (mut message, actor) = self.load_for_actor(tx.as_mut(), message_id, ctx).await?;
        if message.sender_id != ctx.user_id && !actor.role.can_moderate() {
            return Err(AppError::new(
                ErrorKind::AccessDenied,
                "Only the sender or a chat admin can do this",
            ));
        }
        if message.is_deleted == deleted {
            return Ok(message.redacted());
        }

        message.is_deleted = deleted;
        message.updated_at = Some(self.clock.now());
        tx.update_message(&message).await?;
        tx.commit().await?;

        info!(
            message_id = %message_id,
            user_id = %ctx.user_id,
            deleted,
            "Message deletion state changed"
        );
        self.publish_update(ctx, &message);
        Ok(message.redacted())
    }

    async fn load_for_actor(
        &self,
        tx: &mut dyn StoreTx,
        message_id: Uuid,
        ctx: &RequestContext,
    ) -> AppResult<(Message, ChatParticipant)> {
        let message = tx
            .find_message(message_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {message_id} not found")))?;
        let actor = ChatGuard::require_participant(tx, message.chat_id, ctx.user_id).await?;
        if let Some(thread_id) = message.thread_id {
            let thread = load_thread(tx, thread_id).await?;
            if thread.is_system() {
                return Err(AppError::read_only_thread(
                    "Activity entries cannot be changed",
                ));
            }
        }
        Ok((message, actor))
    }

    async fn require_attachable(
        &self,
        tx: &mut dyn StoreTx,
        link_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        let link = tx
            .find_link(link_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File link {link_id} not found")))?;
        let decision = self.resolver.resolve(tx, &link, user_id).await?;
        if decision.level.allows(AccessLevel::View) {
            Ok(())
        } else {
            Err(AppError::access_denied(
                decision.level,
                format!("No access to attachment {link_id}"),
            ))
        }
    }

    fn publish_update(&self, ctx: &RequestContext, message: &Message) {
        self.events.publish(DomainEvent::new(
            self.clock.now(),
            Some(ctx.user_id),
            EventPayload::Message(MessageEvent::Updated {
                chat_id: message.chat_id,
                message_id: message.id,
                is_deleted: message.is_deleted,
            }),
        ));
    }
}
