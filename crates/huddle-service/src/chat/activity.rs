//! The chat's append-only moderator log.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use huddle_core::result::AppResult;
use huddle_database::store::StoreTx;
use huddle_entity::message::Message;
use huddle_entity::thread::SYSTEM_THREAD_TITLE;

use crate::message::timeline::{self, Draft};

/// Writes system messages into a chat's `Activity` thread.
///
/// This is the only write path into a system thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityLog;

impl ActivityLog {
    /// Append an entry. Chats without an activity thread are skipped.
    pub async fn record(
        tx: &mut dyn StoreTx,
        chat_id: Uuid,
        actor_id: Uuid,
        entry: String,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Message>> {
        let Some(thread) = tx.find_system_thread(chat_id, SYSTEM_THREAD_TITLE).await? else {
            warn!(chat_id = %chat_id, "Chat has no activity thread; entry dropped");
            return Ok(None);
        };
        let draft = Draft {
            chat_id,
            thread: Some(thread),
            parent_id: None,
            sender_id: actor_id,
            content: entry,
            file_link_ids: Vec::new(),
        };
        timeline::append(tx, draft, now).await.map(Some)
    }
}
