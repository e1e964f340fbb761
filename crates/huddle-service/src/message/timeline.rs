//! Appending to a chat's sequenced timeline.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use huddle_core::result::AppResult;
use huddle_database::store::StoreTx;
use huddle_entity::message::Message;
use huddle_entity::thread::Thread;

/// A message about to be appended.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub chat_id: Uuid,
    pub thread: Option<Thread>,
    pub parent_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub content: String,
    pub file_link_ids: Vec<Uuid>,
}

/// Allocate the next `seq_num`, insert the message and bump thread counters.
pub(crate) async fn append(
    tx: &mut dyn StoreTx,
    draft: Draft,
    now: DateTime<Utc>,
) -> AppResult<Message> {
    let seq_num = tx.next_seq_num(draft.chat_id).await?;
    let message = Message {
        id: Uuid::new_v4(),
        chat_id: draft.chat_id,
        thread_id: draft.thread.as_ref().map(|t| t.id),
        parent_id: draft.parent_id,
        sender_id: draft.sender_id,
        content: draft.content,
        sent_at: now,
        updated_at: None,
        is_deleted: false,
        seq_num,
        file_link_ids: draft.file_link_ids,
    };
    tx.insert_message(&message).await?;

    if let Some(mut thread) = draft.thread {
        thread.message_count += 1;
        thread.last_message_at = Some(now);
        tx.update_thread(&thread).await?;
    }
    Ok(message)
}
