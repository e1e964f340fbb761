//! Unit-of-work traits.
//!
//! A service opens one [`StoreTx`] per operation, does every read and write
//! through it, and calls [`StoreTx::commit`]. Dropping a transaction without
//! committing discards all of its writes. The per-table traits are split only
//! for readability; callers always hold the combined `Box<dyn StoreTx>`.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::result::AppResult;
use huddle_core::types::pagination::{PageRequest, PageResponse};
use huddle_entity::chat::{Chat, ChatParticipant, ChatRole};
use huddle_entity::file::{File, FileLink, FileLinkPermission, FileStatus};
use huddle_entity::group::{AccessGroup, ChatFileAccessGroups, FileLinkGroupPermission, GroupMember};
use huddle_entity::message::Message;
use huddle_entity::share::FileShareLink;
use huddle_entity::thread::{Thread, ThreadParticipant};

/// A transactional store backend.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug + 'static {
    /// Backend name ("postgres", "memory").
    fn backend(&self) -> &str;

    /// Check the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Open a transaction.
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;
}

/// One open transaction over every table.
#[async_trait]
pub trait StoreTx:
    ChatTx + ParticipantTx + ThreadTx + MessageTx + FileTx + GroupTx + ShareTx + Send
{
    /// Make every write in this transaction durable.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Chats.
#[async_trait]
pub trait ChatTx: Send {
    /// Insert a chat row.
    async fn insert_chat(&mut self, chat: &Chat) -> AppResult<()>;

    /// Find a chat by id.
    async fn find_chat(&mut self, chat_id: Uuid) -> AppResult<Option<Chat>>;

    /// Find a chat and hold its row lock until the transaction ends.
    async fn lock_chat(&mut self, chat_id: Uuid) -> AppResult<Option<Chat>>;

    /// Persist `name` and `updated_at`.
    async fn update_chat(&mut self, chat: &Chat) -> AppResult<()>;

    /// Delete a chat with its participants, threads, messages, binding and
    /// both access groups. File links keep their `chat_id`.
    async fn delete_chat(&mut self, chat_id: Uuid) -> AppResult<bool>;

    /// Chats the user participates in, most recently updated first.
    async fn list_chats_for_user(
        &mut self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Chat>>;

    /// Allocate the next message sequence number for a chat.
    async fn next_seq_num(&mut self, chat_id: Uuid) -> AppResult<i64>;
}

/// Chat participants.
#[async_trait]
pub trait ParticipantTx: Send {
    /// Serialize changes to a chat's participant set for the rest of the
    /// transaction. Held while the admin count or participant cap is checked.
    /// Taken before [`ParticipantTx::lock_membership`] when both are needed.
    async fn lock_roster(&mut self, chat_id: Uuid) -> AppResult<()>;

    /// Serialize membership changes on the (chat, user) pair for the rest of
    /// the transaction.
    async fn lock_membership(&mut self, chat_id: Uuid, user_id: Uuid) -> AppResult<()>;

    /// Find one participant row.
    async fn find_participant(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ChatParticipant>>;

    /// Insert a participant. A duplicate fails with `AlreadyExists`.
    async fn insert_participant(&mut self, participant: &ChatParticipant) -> AppResult<()>;

    /// Change a participant's role; `joined_at` is untouched.
    async fn update_participant_role(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> AppResult<bool>;

    /// Delete a participant row.
    async fn delete_participant(&mut self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Every participant, earliest joiner first.
    async fn list_participants(&mut self, chat_id: Uuid) -> AppResult<Vec<ChatParticipant>>;

    /// Number of admins in a chat.
    async fn count_admins(&mut self, chat_id: Uuid) -> AppResult<i64>;
}

/// Threads and thread participants.
#[async_trait]
pub trait ThreadTx: Send {
    /// Insert a thread row.
    async fn insert_thread(&mut self, thread: &Thread) -> AppResult<()>;

    /// Find a thread by id.
    async fn find_thread(&mut self, thread_id: Uuid) -> AppResult<Option<Thread>>;

    /// Persist the mutable thread columns.
    async fn update_thread(&mut self, thread: &Thread) -> AppResult<()>;

    /// Top-level threads of a chat (`parent = None`) or the children of one thread.
    async fn list_threads(&mut self, chat_id: Uuid, parent: Option<Uuid>)
    -> AppResult<Vec<Thread>>;

    /// The system thread of a chat with the given title.
    async fn find_system_thread(&mut self, chat_id: Uuid, title: &str)
    -> AppResult<Option<Thread>>;

    /// Add a thread participant. Returns `false` if already present.
    async fn insert_thread_participant(&mut self, participant: &ThreadParticipant)
    -> AppResult<bool>;

    /// Remove a thread participant.
    async fn delete_thread_participant(&mut self, thread_id: Uuid, user_id: Uuid)
    -> AppResult<bool>;

    /// Whether the user is an explicit participant of the thread.
    async fn is_thread_participant(&mut self, thread_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Explicit participants of a thread.
    async fn list_thread_participants(&mut self, thread_id: Uuid)
    -> AppResult<Vec<ThreadParticipant>>;

    /// Remove the user from every thread of a chat.
    async fn delete_thread_participants_for_user(
        &mut self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<u64>;
}

/// Messages.
#[async_trait]
pub trait MessageTx: Send {
    /// Insert a message row.
    async fn insert_message(&mut self, message: &Message) -> AppResult<()>;

    /// Find a message by id.
    async fn find_message(&mut self, message_id: Uuid) -> AppResult<Option<Message>>;

    /// Persist `content`, `updated_at` and `is_deleted`.
    async fn update_message(&mut self, message: &Message) -> AppResult<()>;

    /// Messages with `seq_num > after_seq` in ascending order. `thread = None`
    /// selects the chat's main timeline.
    async fn list_messages(
        &mut self,
        chat_id: Uuid,
        thread_id: Option<Uuid>,
        after_seq: i64,
        limit: u64,
    ) -> AppResult<Vec<Message>>;
}

/// Files, links and individual link permissions.
#[async_trait]
pub trait FileTx: Send {
    /// Insert a file row.
    async fn insert_file(&mut self, file: &File) -> AppResult<()>;

    /// Find a file by id.
    async fn find_file(&mut self, file_id: Uuid) -> AppResult<Option<File>>;

    /// Move a file to a new status.
    async fn update_file_status(&mut self, file_id: Uuid, status: FileStatus) -> AppResult<bool>;

    /// Insert a file link.
    async fn insert_link(&mut self, link: &FileLink) -> AppResult<()>;

    /// Find a file link by id.
    async fn find_link(&mut self, link_id: Uuid) -> AppResult<Option<FileLink>>;

    /// Tombstone a file link.
    async fn mark_link_deleted(&mut self, link_id: Uuid) -> AppResult<bool>;

    /// Live links placed in a chat, newest first.
    async fn list_links_for_chat(&mut self, chat_id: Uuid) -> AppResult<Vec<FileLink>>;

    /// Every link of a file, including tombstoned ones.
    async fn list_links_for_file(&mut self, file_id: Uuid) -> AppResult<Vec<FileLink>>;

    /// Insert or replace an individual grant.
    async fn upsert_link_permission(&mut self, permission: &FileLinkPermission) -> AppResult<()>;

    /// Find a user's individual grant on a link.
    async fn find_link_permission(
        &mut self,
        link_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<FileLinkPermission>>;

    /// Remove a user's individual grant on a link.
    async fn delete_link_permission(&mut self, link_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Every individual grant on a link.
    async fn list_link_permissions(&mut self, link_id: Uuid)
    -> AppResult<Vec<FileLinkPermission>>;
}

/// Access groups, bindings and group grants.
#[async_trait]
pub trait GroupTx: Send {
    /// Insert a group.
    async fn insert_group(&mut self, group: &AccessGroup) -> AppResult<()>;

    /// Delete a group with its members and grants.
    async fn delete_group(&mut self, group_id: Uuid) -> AppResult<bool>;

    /// Insert a chat's binding row. A second binding for the same chat fails
    /// with `AlreadyExists`.
    async fn insert_binding(&mut self, binding: &ChatFileAccessGroups) -> AppResult<()>;

    /// Delete a chat's binding row, returning it. The groups are left for
    /// the caller.
    async fn delete_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>>;

    /// Find a chat's binding.
    async fn find_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>>;

    /// Find a chat's binding and hold a shared lock on it until the
    /// transaction ends, so the chat cannot be deleted underneath.
    async fn lock_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>>;

    /// Add a member. Returns `false` if already present.
    async fn insert_group_member(&mut self, member: &GroupMember) -> AppResult<bool>;

    /// Remove a member.
    async fn delete_group_member(&mut self, group_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Whether the user is in the group.
    async fn is_group_member(&mut self, group_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Every member of a group.
    async fn list_group_members(&mut self, group_id: Uuid) -> AppResult<Vec<GroupMember>>;

    /// Insert a group grant on a link.
    async fn insert_group_permission(&mut self, permission: &FileLinkGroupPermission)
    -> AppResult<()>;

    /// Every group grant on a link.
    async fn list_group_permissions(&mut self, link_id: Uuid)
    -> AppResult<Vec<FileLinkGroupPermission>>;
}

/// Public share links.
#[async_trait]
pub trait ShareTx: Send {
    /// Insert a share link.
    async fn insert_share_link(&mut self, link: &FileShareLink) -> AppResult<()>;

    /// Find a share link by id.
    async fn find_share_link(&mut self, share_id: Uuid) -> AppResult<Option<FileShareLink>>;

    /// Find a share link by token, active or not.
    async fn find_share_link_by_token(&mut self, token: &str)
    -> AppResult<Option<FileShareLink>>;

    /// Clear `is_active`.
    async fn deactivate_share_link(&mut self, share_id: Uuid) -> AppResult<bool>;

    /// Increment the download counter unless the cap is reached.
    ///
    /// Returns the new count, or `None` when the cap was already hit.
    async fn try_consume_download(&mut self, share_id: Uuid) -> AppResult<Option<i32>>;

    /// Share links of a file, newest first.
    async fn list_share_links(&mut self, file_id: Uuid) -> AppResult<Vec<FileShareLink>>;
}
