//! Threads and subthreads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use huddle_auth::{ChatGuard, ThreadAccessChecker};
use huddle_core::error::{AppError, ErrorKind};
use huddle_core::events::{DomainEvent, EventPayload, ThreadEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_core::types::pagination::{PageRequest, PageResponse};
use huddle_database::store::{Store, StoreTx};
use huddle_entity::chat::model::validate_name;
use huddle_entity::thread::{MAX_THREAD_DEPTH, Thread, ThreadParticipant, ThreadType};

use super::access::{load_thread, require_thread_access};
use crate::context::RequestContext;

/// Parameters for a top-level thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThreadRequest {
    /// Owning chat.
    pub chat_id: Uuid,
    /// Message the thread replies to.
    pub parent_message_id: Option<Uuid>,
    /// `user` for conversation threads; `system` threads need an admin.
    pub thread_type: ThreadType,
    /// Optional title.
    pub title: Option<String>,
    /// Require explicit thread membership.
    #[serde(default)]
    pub restricted: bool,
}

/// Parameters for a subthread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubthreadRequest {
    /// Optional title.
    pub title: Option<String>,
    /// Thread type.
    pub thread_type: ThreadType,
    /// Require explicit thread membership.
    #[serde(default)]
    pub restricted: bool,
}

/// Creates, lists and archives threads and manages their allow-lists.
#[derive(Clone)]
pub struct ThreadService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Event sink.
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for ThreadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadService").finish()
    }
}

impl ThreadService {
    /// Creates a new thread service.
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

    /// Create a top-level thread in a chat.
    pub async fn create_thread(
        &self,
        ctx: &RequestContext,
        req: CreateThreadRequest,
    ) -> AppResult<Thread> {
        let title = normalize_title(req.title)?;

        let mut tx = self.store.begin().await?;
        let participant =
            ChatGuard::require_participant(tx.as_mut(), req.chat_id, ctx.user_id).await?;
        match req.thread_type {
            ThreadType::System => {
                ChatGuard::require_moderator(tx.as_mut(), req.chat_id, ctx.user_id).await?;
            }
            ThreadType::User if !participant.role.can_post() => {
                return Err(AppError::new(
                    ErrorKind::AccessDenied,
                    "Read-only participants cannot start threads",
                ));
            }
            ThreadType::User => {}
        }

        if let Some(message_id) = req.parent_message_id {
            let belongs = tx
                .find_message(message_id)
                .await?
                .is_some_and(|m| m.chat_id == req.chat_id);
            if !belongs {
                return Err(AppError::not_found(format!("Message {message_id} not found")));
            }
        }

        let now = self.clock.now();
        let created_by = match req.thread_type {
            ThreadType::User => Some(ctx.user_id),
            ThreadType::System => None,
        };
        let mut thread = Thread::top_level(
            req.chat_id,
            req.thread_type,
            title,
            created_by,
            req.restricted,
            now,
        );
        thread.parent_message_id = req.parent_message_id;

        self.insert(tx, ctx, thread).await
    }

    /// Create a thread nested under another. Depth is the parent's plus one
    /// and may not exceed the cap.
    pub async fn create_subthread(
        &self,
        ctx: &RequestContext,
        parent_thread_id: Uuid,
        req: CreateSubthreadRequest,
    ) -> AppResult<Thread> {
        let title = normalize_title(req.title)?;

        let mut tx = self.store.begin().await?;
        let parent = load_thread(tx.as_mut(), parent_thread_id).await?;
        // Access is checked before the parent's depth or state is revealed.
        require_thread_access(tx.as_mut(), &parent, ctx.user_id).await?;
        let participant =
            ChatGuard::require_participant(tx.as_mut(), parent.chat_id, ctx.user_id).await?;
        if !parent.can_nest() {
            return Err(AppError::max_depth_exceeded(format!(
                "Thread {parent_thread_id} is at depth {}; subthreads stop at {MAX_THREAD_DEPTH}",
                parent.depth
            )));
        }
        if parent.is_system() {
            return Err(AppError::read_only_thread(format!(
                "Thread {parent_thread_id} is a system thread"
            )));
        }
        if parent.is_archived {
            return Err(AppError::conflict(format!(
                "Thread {parent_thread_id} is archived"
            )));
        }
        match req.thread_type {
            ThreadType::System => {
                ChatGuard::require_moderator(tx.as_mut(), parent.chat_id, ctx.user_id).await?;
            }
            ThreadType::User if !participant.role.can_post() => {
                return Err(AppError::new(
                    ErrorKind::AccessDenied,
                    "Read-only participants cannot start threads",
                ));
            }
            ThreadType::User => {}
        }

        let now = self.clock.now();
        let created_by = match req.thread_type {
            ThreadType::User => Some(ctx.user_id),
            ThreadType::System => None,
        };
        let mut thread = Thread::top_level(
            parent.chat_id,
            req.thread_type,
            title,
            created_by,
            req.restricted,
            now,
        );
        thread.parent_thread_id = Some(parent.id);
        thread.depth = parent.child_depth();

        self.insert(tx, ctx, thread).await
    }

    async fn insert(
        &self,
        mut tx: Box<dyn StoreTx>,
        ctx: &RequestContext,
        thread: Thread,
    ) -> AppResult<Thread> {
        tx.insert_thread(&thread).await?;
        if thread.restricted_participants {
            tx.insert_thread_participant(&ThreadParticipant {
                thread_id: thread.id,
                user_id: ctx.user_id,
                added_at: thread.created_at,
            })
            .await?;
        }
        tx.commit().await?;

        info!(
            chat_id = %thread.chat_id,
            thread_id = %thread.id,
            depth = thread.depth,
            restricted = thread.restricted_participants,
            "Thread created"
        );
        self.events.publish(DomainEvent::new(
            thread.created_at,
            Some(ctx.user_id),
            EventPayload::Thread(ThreadEvent::Created {
                chat_id: thread.chat_id,
                thread_id: thread.id,
                parent_thread_id: thread.parent_thread_id,
                depth: thread.depth,
            }),
        ));
        Ok(thread)
    }

    /// Top-level threads of a chat that the actor can read.
    pub async fn list_threads(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Thread>> {
        let mut tx = self.store.begin().await?;
        ChatGuard::require_participant(tx.as_mut(), chat_id, ctx.user_id).await?;
        let threads = tx.list_threads(chat_id, None).await?;
        let visible = visible_to(tx.as_mut(), threads, ctx.user_id).await?;
        Ok(page.paginate(visible))
    }

    /// Direct children of a thread that the actor can read.
    pub async fn list_subthreads(
        &self,
        ctx: &RequestContext,
        parent_thread_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Thread>> {
        let mut tx = self.store.begin().await?;
        let parent = load_thread(tx.as_mut(), parent_thread_id).await?;
        require_thread_access(tx.as_mut(), &parent, ctx.user_id).await?;
        let threads = tx.list_threads(parent.chat_id, Some(parent.id)).await?;
        let visible = visible_to(tx.as_mut(), threads, ctx.user_id).await?;
        Ok(page.paginate(visible))
    }

    /// Archive a thread. Thread creator or chat admin only.
    pub async fn archive_thread(&self, ctx: &RequestContext, thread_id: Uuid) -> AppResult<Thread> {
        let mut tx = self.store.begin().await?;
        let mut thread = load_thread(tx.as_mut(), thread_id).await?;
        require_thread_access(tx.as_mut(), &thread, ctx.user_id).await?;
        if thread.is_system() {
            return Err(AppError::read_only_thread(format!(
                "Thread {thread_id} is a system thread"
            )));
        }
        self.require_thread_manager(tx.as_mut(), &thread, ctx.user_id)
            .await?;
        if thread.is_archived {
            return Ok(thread);
        }

        thread.is_archived = true;
        tx.update_thread(&thread).await?;
        tx.commit().await?;

        info!(thread_id = %thread_id, user_id = %ctx.user_id, "Thread archived");
        self.events.publish(DomainEvent::new(
            self.clock.now(),
            Some(ctx.user_id),
            EventPayload::Thread(ThreadEvent::Archived {
                chat_id: thread.chat_id,
                thread_id,
            }),
        ));
        Ok(thread)
    }

    /// Put a chat participant on a thread's allow-list.
    /// Returns `false` if they were already on it.
    pub async fn add_thread_participant(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let mut tx = self.store.begin().await?;
        let thread = load_thread(tx.as_mut(), thread_id).await?;
        require_thread_access(tx.as_mut(), &thread, ctx.user_id).await?;
        self.require_thread_manager(tx.as_mut(), &thread, ctx.user_id)
            .await?;
        if !ChatGuard::is_participant(tx.as_mut(), thread.chat_id, user_id).await? {
            return Err(AppError::not_participant(format!(
                "User {user_id} is not in chat {}",
                thread.chat_id
            )));
        }

        let added = tx
            .insert_thread_participant(&ThreadParticipant {
                thread_id,
                user_id,
                added_at: self.clock.now(),
            })
            .await?;
        tx.commit().await?;

        if added {
            info!(thread_id = %thread_id, user_id = %user_id, added_by = %ctx.user_id, "Thread participant added");
        }
        Ok(added)
    }

    /// Take a user off a thread's allow-list.
    pub async fn remove_thread_participant(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let mut tx = self.store.begin().await?;
        let thread = load_thread(tx.as_mut(), thread_id).await?;
        if !ctx.is(user_id) {
            require_thread_access(tx.as_mut(), &thread, ctx.user_id).await?;
            self.require_thread_manager(tx.as_mut(), &thread, ctx.user_id)
                .await?;
        }
        let removed = tx.delete_thread_participant(thread_id, user_id).await?;
        tx.commit().await?;

        if removed {
            info!(thread_id = %thread_id, user_id = %user_id, removed_by = %ctx.user_id, "Thread participant removed");
        }
        Ok(removed)
    }

    /// The thread allow-list.
    pub async fn list_thread_participants(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
    ) -> AppResult<Vec<ThreadParticipant>> {
        let mut tx = self.store.begin().await?;
        let thread = load_thread(tx.as_mut(), thread_id).await?;
        require_thread_access(tx.as_mut(), &thread, ctx.user_id).await?;
        tx.list_thread_participants(thread_id).await
    }

    /// The cascading access check. Unknown threads are `false`.
    pub async fn check_thread_access(&self, thread_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut tx = self.store.begin().await?;
        ThreadAccessChecker::check_thread_access(tx.as_mut(), thread_id, user_id).await
    }

    async fn require_thread_manager(
        &self,
        tx: &mut dyn StoreTx,
        thread: &Thread,
        user_id: Uuid,
    ) -> AppResult<()> {
        if thread.created_by == Some(user_id) {
            return Ok(());
        }
        let is_admin = tx
            .find_participant(thread.chat_id, user_id)
            .await?
            .is_some_and(|p| p.role.can_moderate());
        if is_admin {
            Ok(())
        } else {
            Err(AppError::new(
                ErrorKind::AccessDenied,
                "Only the thread creator or a chat admin can manage this thread",
            ))
        }
    }
}

fn normalize_title(title: Option<String>) -> AppResult<Option<String>> {
    match title {
        Some(t) => {
            validate_name("Thread title", &t)?;
            Ok(Some(t.trim().to_string()))
        }
        None => Ok(None),
    }
}

async fn visible_to(
    tx: &mut dyn StoreTx,
    threads: Vec<Thread>,
    user_id: Uuid,
) -> AppResult<Vec<Thread>> {
    let mut visible = Vec::with_capacity(threads.len());
    for thread in threads {
        if ThreadAccessChecker::check_loaded(tx, thread.clone(), user_id).await? {
            visible.push(thread);
        }
    }
    Ok(visible)
}
