//! Tables of the in-memory store.

use std::collections::HashMap;

use uuid::Uuid;

use huddle_entity::chat::{Chat, ChatParticipant};
use huddle_entity::file::{File, FileLink, FileLinkPermission};
use huddle_entity::group::{AccessGroup, ChatFileAccessGroups, FileLinkGroupPermission, GroupMember};
use huddle_entity::message::Message;
use huddle_entity::share::FileShareLink;
use huddle_entity::thread::{Thread, ThreadParticipant};

/// Every table, keyed the way the PostgreSQL primary keys are.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    pub chats: HashMap<Uuid, Chat>,
    pub participants: HashMap<(Uuid, Uuid), ChatParticipant>,
    pub threads: HashMap<Uuid, Thread>,
    pub thread_participants: HashMap<(Uuid, Uuid), ThreadParticipant>,
    pub messages: HashMap<Uuid, Message>,
    pub files: HashMap<Uuid, File>,
    pub links: HashMap<Uuid, FileLink>,
    /// Keyed by (link, user).
    pub link_permissions: HashMap<(Uuid, Uuid), FileLinkPermission>,
    pub groups: HashMap<Uuid, AccessGroup>,
    /// Keyed by (group, user).
    pub group_members: HashMap<(Uuid, Uuid), GroupMember>,
    /// Keyed by chat.
    pub bindings: HashMap<Uuid, ChatFileAccessGroups>,
    /// Keyed by (link, group).
    pub group_permissions: HashMap<(Uuid, Uuid), FileLinkGroupPermission>,
    pub share_links: HashMap<Uuid, FileShareLink>,
}

impl MemoryState {
    /// Remove a group with its members and grants.
    pub fn remove_group(&mut self, group_id: Uuid) -> bool {
        self.group_members.retain(|(group, _), _| *group != group_id);
        self.group_permissions.retain(|(_, group), _| *group != group_id);
        self.groups.remove(&group_id).is_some()
    }

    /// Remove a chat and everything that cascades from it.
    pub fn remove_chat(&mut self, chat_id: Uuid) -> bool {
        if self.chats.remove(&chat_id).is_none() {
            return false;
        }
        self.participants.retain(|(chat, _), _| *chat != chat_id);
        let threads: Vec<Uuid> = self
            .threads
            .values()
            .filter(|t| t.chat_id == chat_id)
            .map(|t| t.id)
            .collect();
        self.thread_participants
            .retain(|(thread, _), _| !threads.contains(thread));
        self.threads.retain(|_, t| t.chat_id != chat_id);
        self.messages.retain(|_, m| m.chat_id != chat_id);
        if let Some(binding) = self.bindings.remove(&chat_id) {
            self.remove_group(binding.moderate_group_id);
            self.remove_group(binding.view_group_id);
        }
        true
    }
}
