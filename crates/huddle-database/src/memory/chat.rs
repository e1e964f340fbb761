//! Chats and participants.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_core::types::pagination::{PageRequest, PageResponse};
use huddle_entity::chat::{Chat, ChatParticipant, ChatRole};

use super::MemoryTx;
use crate::store::{ChatTx, ParticipantTx};

#[async_trait]
impl ChatTx for MemoryTx {
    async fn insert_chat(&mut self, chat: &Chat) -> AppResult<()> {
        let state = self.write();
        if state.chats.contains_key(&chat.id) {
            return Err(AppError::already_exists("Chat already exists"));
        }
        state.chats.insert(chat.id, chat.clone());
        Ok(())
    }

    async fn find_chat(&mut self, chat_id: Uuid) -> AppResult<Option<Chat>> {
        Ok(self.read().chats.get(&chat_id).cloned())
    }

    async fn lock_chat(&mut self, chat_id: Uuid) -> AppResult<Option<Chat>> {
        // Transactions already hold the store mutex.
        self.find_chat(chat_id).await
    }

    async fn update_chat(&mut self, chat: &Chat) -> AppResult<()> {
        if let Some(row) = self.write().chats.get_mut(&chat.id) {
            row.name = chat.name.clone();
            row.updated_at = chat.updated_at;
        }
        Ok(())
    }

    async fn delete_chat(&mut self, chat_id: Uuid) -> AppResult<bool> {
        if !self.read().chats.contains_key(&chat_id) {
            return Ok(false);
        }
        Ok(self.write().remove_chat(chat_id))
    }

    async fn list_chats_for_user(
        &mut self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Chat>> {
        let state = self.read();
        let mut chats: Vec<Chat> = state
            .participants
            .values()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| state.chats.get(&p.chat_id).cloned())
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(page.paginate(chats))
    }

    async fn next_seq_num(&mut self, chat_id: Uuid) -> AppResult<i64> {
        if !self.read().chats.contains_key(&chat_id) {
            return Err(AppError::not_found(format!("Chat {chat_id} not found")));
        }
        let chat = self
            .write()
            .chats
            .get_mut(&chat_id)
            .ok_or_else(|| AppError::not_found(format!("Chat {chat_id} not found")))?;
        chat.last_seq_num += 1;
        Ok(chat.last_seq_num)
    }
}

#[async_trait]
impl ParticipantTx for MemoryTx {
    async fn lock_roster(&mut self, _chat_id: Uuid) -> AppResult<()> {
        Ok(())
    }

    async fn lock_membership(&mut self, _chat_id: Uuid, _user_id: Uuid) -> AppResult<()> {
        Ok(())
    }

    async fn find_participant(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ChatParticipant>> {
        Ok(self.read().participants.get(&(chat_id, user_id)).cloned())
    }

    async fn insert_participant(&mut self, participant: &ChatParticipant) -> AppResult<()> {
        let key = (participant.chat_id, participant.user_id);
        if self.read().participants.contains_key(&key) {
            return Err(AppError::already_exists("Participant already exists"));
        }
        if !self.read().chats.contains_key(&participant.chat_id) {
            return Err(AppError::not_found(format!(
                "Chat {} not found",
                participant.chat_id
            )));
        }
        self.write().participants.insert(key, participant.clone());
        Ok(())
    }

    async fn update_participant_role(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> AppResult<bool> {
        if !self.read().participants.contains_key(&(chat_id, user_id)) {
            return Ok(false);
        }
        if let Some(row) = self.write().participants.get_mut(&(chat_id, user_id)) {
            row.role = role;
        }
        Ok(true)
    }

    async fn delete_participant(&mut self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        if !self.read().participants.contains_key(&(chat_id, user_id)) {
            return Ok(false);
        }
        Ok(self.write().participants.remove(&(chat_id, user_id)).is_some())
    }

    async fn list_participants(&mut self, chat_id: Uuid) -> AppResult<Vec<ChatParticipant>> {
        let mut rows: Vec<ChatParticipant> = self
            .read()
            .participants
            .values()
            .filter(|p| p.chat_id == chat_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.user_id.cmp(&b.user_id)));
        Ok(rows)
    }

    async fn count_admins(&mut self, chat_id: Uuid) -> AppResult<i64> {
        Ok(self
            .read()
            .participants
            .values()
            .filter(|p| p.chat_id == chat_id && p.role == ChatRole::Admin)
            .count() as i64)
    }
}
