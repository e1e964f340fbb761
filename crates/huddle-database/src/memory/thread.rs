//! Threads, thread participants and messages.

use std::cmp::Ordering;

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_entity::message::Message;
use huddle_entity::thread::{Thread, ThreadParticipant, ThreadType};

use super::MemoryTx;
use crate::store::{MessageTx, ThreadTx};

/// Most recent activity first, never-posted last, then newest created.
fn thread_order(a: &Thread, b: &Thread) -> Ordering {
    match (a.last_message_at, b.last_message_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(b.created_at.cmp(&a.created_at))
    .then(a.id.cmp(&b.id))
}

#[async_trait]
impl ThreadTx for MemoryTx {
    async fn insert_thread(&mut self, thread: &Thread) -> AppResult<()> {
        if !self.read().chats.contains_key(&thread.chat_id) {
            return Err(AppError::not_found(format!("Chat {} not found", thread.chat_id)));
        }
        if thread.is_system() && thread.title.is_some() {
            let duplicate = self.read().threads.values().any(|t| {
                t.chat_id == thread.chat_id && t.is_system() && t.title == thread.title
            });
            if duplicate {
                return Err(AppError::already_exists(format!(
                    "System thread {:?} already exists in chat {}",
                    thread.title, thread.chat_id
                )));
            }
        }
        self.write().threads.insert(thread.id, thread.clone());
        Ok(())
    }

    async fn find_thread(&mut self, thread_id: Uuid) -> AppResult<Option<Thread>> {
        Ok(self.read().threads.get(&thread_id).cloned())
    }

    async fn update_thread(&mut self, thread: &Thread) -> AppResult<()> {
        if let Some(row) = self.write().threads.get_mut(&thread.id) {
            row.title = thread.title.clone();
            row.message_count = thread.message_count;
            row.last_message_at = thread.last_message_at;
            row.is_archived = thread.is_archived;
        }
        Ok(())
    }

    async fn list_threads(
        &mut self,
        chat_id: Uuid,
        parent: Option<Uuid>,
    ) -> AppResult<Vec<Thread>> {
        let mut rows: Vec<Thread> = self
            .read()
            .threads
            .values()
            .filter(|t| t.chat_id == chat_id && t.parent_thread_id == parent)
            .cloned()
            .collect();
        rows.sort_by(thread_order);
        Ok(rows)
    }

    async fn find_system_thread(
        &mut self,
        chat_id: Uuid,
        title: &str,
    ) -> AppResult<Option<Thread>> {
        Ok(self
            .read()
            .threads
            .values()
            .filter(|t| {
                t.chat_id == chat_id
                    && t.thread_type == ThreadType::System
                    && t.title.as_deref() == Some(title)
            })
            .min_by_key(|t| t.created_at)
            .cloned())
    }

    async fn insert_thread_participant(
        &mut self,
        participant: &ThreadParticipant,
    ) -> AppResult<bool> {
        let key = (participant.thread_id, participant.user_id);
        if self.read().thread_participants.contains_key(&key) {
            return Ok(false);
        }
        self.write()
            .thread_participants
            .insert(key, participant.clone());
        Ok(true)
    }

    async fn delete_thread_participant(
        &mut self,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        if !self
            .read()
            .thread_participants
            .contains_key(&(thread_id, user_id))
        {
            return Ok(false);
        }
        Ok(self
            .write()
            .thread_participants
            .remove(&(thread_id, user_id))
            .is_some())
    }

    async fn is_thread_participant(&mut self, thread_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self
            .read()
            .thread_participants
            .contains_key(&(thread_id, user_id)))
    }

    async fn list_thread_participants(
        &mut self,
        thread_id: Uuid,
    ) -> AppResult<Vec<ThreadParticipant>> {
        let mut rows: Vec<ThreadParticipant> = self
            .read()
            .thread_participants
            .values()
            .filter(|p| p.thread_id == thread_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.user_id.cmp(&b.user_id)));
        Ok(rows)
    }

    async fn delete_thread_participants_for_user(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<u64> {
        let keys: Vec<(Uuid, Uuid)> = {
            let state = self.read();
            state
                .thread_participants
                .keys()
                .filter(|(thread, user)| {
                    *user == user_id
                        && state
                            .threads
                            .get(thread)
                            .is_some_and(|t| t.chat_id == chat_id)
                })
                .copied()
                .collect()
        };
        if keys.is_empty() {
            return Ok(0);
        }
        let state = self.write();
        for key in &keys {
            state.thread_participants.remove(key);
        }
        Ok(keys.len() as u64)
    }
}

#[async_trait]
impl MessageTx for MemoryTx {
    async fn insert_message(&mut self, message: &Message) -> AppResult<()> {
        let duplicate_seq = self
            .read()
            .messages
            .values()
            .any(|m| m.chat_id == message.chat_id && m.seq_num == message.seq_num);
        if duplicate_seq {
            return Err(AppError::already_exists("Message sequence number already used"));
        }
        self.write().messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn find_message(&mut self, message_id: Uuid) -> AppResult<Option<Message>> {
        Ok(self.read().messages.get(&message_id).cloned())
    }

    async fn update_message(&mut self, message: &Message) -> AppResult<()> {
        if let Some(row) = self.write().messages.get_mut(&message.id) {
            row.content = message.content.clone();
            row.updated_at = message.updated_at;
            row.is_deleted = message.is_deleted;
        }
        Ok(())
    }

    async fn list_messages(
        &mut self,
        chat_id: Uuid,
        thread_id: Option<Uuid>,
        after_seq: i64,
        limit: u64,
    ) -> AppResult<Vec<Message>> {
        let mut rows: Vec<Message> = self
            .read()
            .messages
            .values()
            .filter(|m| m.chat_id == chat_id && m.thread_id == thread_id && m.seq_num > after_seq)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.seq_num);
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
