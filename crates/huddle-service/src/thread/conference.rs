//! Conference thread sync with the conferencing collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use huddle_core::error::AppError;
use huddle_core::events::{DomainEvent, EventPayload, ThreadEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_database::store::Store;
use huddle_entity::thread::{CONFERENCE_THREAD_TITLE, Thread, ThreadType};

/// What the conferencing service reports for one chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceState {
    /// An ad-hoc conference is running.
    pub active: bool,
    /// A conference is on the calendar.
    pub scheduled: bool,
    /// Users currently in the conference.
    pub participant_ids: Vec<Uuid>,
}

impl ConferenceState {
    /// Whether the chat should carry a conference thread.
    pub fn wants_thread(&self) -> bool {
        self.active || self.scheduled || !self.participant_ids.is_empty()
    }
}

/// Read-only view of the conferencing service.
#[async_trait]
pub trait ConferenceDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Current conference state of a chat.
    async fn conference_state(&self, chat_id: Uuid) -> AppResult<ConferenceState>;
}

/// Directory for deployments without conferencing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConferences;

#[async_trait]
impl ConferenceDirectory for NoConferences {
    async fn conference_state(&self, _chat_id: Uuid) -> AppResult<ConferenceState> {
        Ok(ConferenceState::default())
    }
}

/// Creates a chat's `Conference` system thread when a conference exists.
#[derive(Clone)]
pub struct ConferenceThreadSync {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventPublisher>,
    directory: Arc<dyn ConferenceDirectory>,
}

impl std::fmt::Debug for ConferenceThreadSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConferenceThreadSync")
            .field("directory", &self.directory)
            .finish()
    }
}

impl ConferenceThreadSync {
    /// Creates a new sync over the given directory.
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventPublisher>,
        directory: Arc<dyn ConferenceDirectory>,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            directory,
        }
    }

    /// Ensure the conference thread exists if the chat has a conference.
    ///
    /// Returns the conference thread, or `None` when there is no conference
    /// and no thread yet. Never removes an existing thread.
    pub async fn sync_conference_thread(&self, chat_id: Uuid) -> AppResult<Option<Thread>> {
        let state = self.directory.conference_state(chat_id).await?;

        let mut tx = self.store.begin().await?;
        // The chat row lock makes concurrent syncs of one chat take turns.
        tx.lock_chat(chat_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Chat {chat_id} not found")))?;
        if let Some(existing) = tx
            .find_system_thread(chat_id, CONFERENCE_THREAD_TITLE)
            .await?
        {
            return Ok(Some(existing));
        }
        if !state.wants_thread() {
            return Ok(None);
        }

        let thread = Thread::top_level(
            chat_id,
            ThreadType::System,
            Some(CONFERENCE_THREAD_TITLE.to_string()),
            None,
            false,
            self.clock.now(),
        );
        tx.insert_thread(&thread).await?;
        tx.commit().await?;

        info!(
            chat_id = %chat_id,
            thread_id = %thread.id,
            active = state.active,
            scheduled = state.scheduled,
            "Conference thread created"
        );
        self.events.publish(DomainEvent::new(
            thread.created_at,
            None,
            EventPayload::Thread(ThreadEvent::Created {
                chat_id,
                thread_id: thread.id,
                parent_thread_id: None,
                depth: 0,
            }),
        ));
        Ok(Some(thread))
    }
}
