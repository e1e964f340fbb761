//! Files, links, groups and share links.

use async_trait::async_trait;
use uuid::Uuid;

use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_entity::file::{File, FileLink, FileLinkPermission, FileStatus};
use huddle_entity::group::{AccessGroup, ChatFileAccessGroups, FileLinkGroupPermission, GroupMember};
use huddle_entity::share::FileShareLink;

use super::MemoryTx;
use crate::store::{FileTx, GroupTx, ShareTx};

#[async_trait]
impl FileTx for MemoryTx {
    async fn insert_file(&mut self, file: &File) -> AppResult<()> {
        if self.read().files.contains_key(&file.id) {
            return Err(AppError::already_exists("File already exists"));
        }
        self.write().files.insert(file.id, file.clone());
        Ok(())
    }

    async fn find_file(&mut self, file_id: Uuid) -> AppResult<Option<File>> {
        Ok(self.read().files.get(&file_id).cloned())
    }

    async fn update_file_status(&mut self, file_id: Uuid, status: FileStatus) -> AppResult<bool> {
        if !self.read().files.contains_key(&file_id) {
            return Ok(false);
        }
        if let Some(file) = self.write().files.get_mut(&file_id) {
            file.status = status;
        }
        Ok(true)
    }

    async fn insert_link(&mut self, link: &FileLink) -> AppResult<()> {
        if !self.read().files.contains_key(&link.file_id) {
            return Err(AppError::not_found(format!("File {} not found", link.file_id)));
        }
        self.write().links.insert(link.id, link.clone());
        Ok(())
    }

    async fn find_link(&mut self, link_id: Uuid) -> AppResult<Option<FileLink>> {
        Ok(self.read().links.get(&link_id).cloned())
    }

    async fn mark_link_deleted(&mut self, link_id: Uuid) -> AppResult<bool> {
        if !self.read().links.contains_key(&link_id) {
            return Ok(false);
        }
        if let Some(link) = self.write().links.get_mut(&link_id) {
            link.is_deleted = true;
        }
        Ok(true)
    }

    async fn list_links_for_chat(&mut self, chat_id: Uuid) -> AppResult<Vec<FileLink>> {
        let mut rows: Vec<FileLink> = self
            .read()
            .links
            .values()
            .filter(|l| l.chat_id == Some(chat_id) && !l.is_deleted)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn list_links_for_file(&mut self, file_id: Uuid) -> AppResult<Vec<FileLink>> {
        let mut rows: Vec<FileLink> = self
            .read()
            .links
            .values()
            .filter(|l| l.file_id == file_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn upsert_link_permission(&mut self, permission: &FileLinkPermission) -> AppResult<()> {
        self.write().link_permissions.insert(
            (permission.file_link_id, permission.user_id),
            permission.clone(),
        );
        Ok(())
    }

    async fn find_link_permission(
        &mut self,
        link_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<FileLinkPermission>> {
        Ok(self.read().link_permissions.get(&(link_id, user_id)).cloned())
    }

    async fn delete_link_permission(&mut self, link_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        if !self.read().link_permissions.contains_key(&(link_id, user_id)) {
            return Ok(false);
        }
        Ok(self
            .write()
            .link_permissions
            .remove(&(link_id, user_id))
            .is_some())
    }

    async fn list_link_permissions(
        &mut self,
        link_id: Uuid,
    ) -> AppResult<Vec<FileLinkPermission>> {
        let mut rows: Vec<FileLinkPermission> = self
            .read()
            .link_permissions
            .values()
            .filter(|p| p.file_link_id == link_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.granted_at.cmp(&b.granted_at).then(a.user_id.cmp(&b.user_id)));
        Ok(rows)
    }
}

#[async_trait]
impl GroupTx for MemoryTx {
    async fn insert_group(&mut self, group: &AccessGroup) -> AppResult<()> {
        let taken = self
            .read()
            .groups
            .values()
            .any(|g| g.id == group.id || g.name == group.name);
        if taken {
            return Err(AppError::already_exists("Access group already exists"));
        }
        self.write().groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn delete_group(&mut self, group_id: Uuid) -> AppResult<bool> {
        if !self.read().groups.contains_key(&group_id) {
            return Ok(false);
        }
        Ok(self.write().remove_group(group_id))
    }

    async fn insert_binding(&mut self, binding: &ChatFileAccessGroups) -> AppResult<()> {
        let state = self.read();
        if state.bindings.contains_key(&binding.chat_id) {
            return Err(AppError::already_exists(
                "Chat access group binding already exists",
            ));
        }
        if !state.chats.contains_key(&binding.chat_id) {
            return Err(AppError::not_found(format!("Chat {} not found", binding.chat_id)));
        }
        if !state.groups.contains_key(&binding.moderate_group_id)
            || !state.groups.contains_key(&binding.view_group_id)
        {
            return Err(AppError::not_found("Bound access group not found"));
        }
        self.write().bindings.insert(binding.chat_id, *binding);
        Ok(())
    }

    async fn delete_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>> {
        if !self.read().bindings.contains_key(&chat_id) {
            return Ok(None);
        }
        Ok(self.write().bindings.remove(&chat_id))
    }

    async fn find_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>> {
        Ok(self.read().bindings.get(&chat_id).copied())
    }

    async fn lock_binding(&mut self, chat_id: Uuid) -> AppResult<Option<ChatFileAccessGroups>> {
        self.find_binding(chat_id).await
    }

    async fn insert_group_member(&mut self, member: &GroupMember) -> AppResult<bool> {
        let key = (member.group_id, member.user_id);
        if self.read().group_members.contains_key(&key) {
            return Ok(false);
        }
        if !self.read().groups.contains_key(&member.group_id) {
            return Err(AppError::not_found(format!(
                "Access group {} not found",
                member.group_id
            )));
        }
        self.write().group_members.insert(key, member.clone());
        Ok(true)
    }

    async fn delete_group_member(&mut self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        if !self.read().group_members.contains_key(&(group_id, user_id)) {
            return Ok(false);
        }
        Ok(self
            .write()
            .group_members
            .remove(&(group_id, user_id))
            .is_some())
    }

    async fn is_group_member(&mut self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self.read().group_members.contains_key(&(group_id, user_id)))
    }

    async fn list_group_members(&mut self, group_id: Uuid) -> AppResult<Vec<GroupMember>> {
        let mut rows: Vec<GroupMember> = self
            .read()
            .group_members
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.user_id.cmp(&b.user_id)));
        Ok(rows)
    }

    async fn insert_group_permission(
        &mut self,
        permission: &FileLinkGroupPermission,
    ) -> AppResult<()> {
        let key = (permission.file_link_id, permission.group_id);
        let state = self.read();
        if state.group_permissions.contains_key(&key) {
            return Err(AppError::already_exists("Group permission already exists"));
        }
        if !state.links.contains_key(&permission.file_link_id)
            || !state.groups.contains_key(&permission.group_id)
        {
            return Err(AppError::not_found("File link or access group not found"));
        }
        self.write().group_permissions.insert(key, permission.clone());
        Ok(())
    }

    async fn list_group_permissions(
        &mut self,
        link_id: Uuid,
    ) -> AppResult<Vec<FileLinkGroupPermission>> {
        Ok(self
            .read()
            .group_permissions
            .values()
            .filter(|p| p.file_link_id == link_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ShareTx for MemoryTx {
    async fn insert_share_link(&mut self, link: &FileShareLink) -> AppResult<()> {
        if self.read().share_links.values().any(|s| s.token == link.token) {
            return Err(AppError::already_exists("Share token already exists"));
        }
        self.write().share_links.insert(link.id, link.clone());
        Ok(())
    }

    async fn find_share_link(&mut self, share_id: Uuid) -> AppResult<Option<FileShareLink>> {
        Ok(self.read().share_links.get(&share_id).cloned())
    }

    async fn find_share_link_by_token(&mut self, token: &str) -> AppResult<Option<FileShareLink>> {
        Ok(self
            .read()
            .share_links
            .values()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn deactivate_share_link(&mut self, share_id: Uuid) -> AppResult<bool> {
        if !self.read().share_links.contains_key(&share_id) {
            return Ok(false);
        }
        if let Some(link) = self.write().share_links.get_mut(&share_id) {
            link.is_active = false;
        }
        Ok(true)
    }

    async fn try_consume_download(&mut self, share_id: Uuid) -> AppResult<Option<i32>> {
        let available = self
            .read()
            .share_links
            .get(&share_id)
            .is_some_and(|s| !s.is_exhausted());
        if !available {
            return Ok(None);
        }
        Ok(self.write().share_links.get_mut(&share_id).map(|s| {
            s.download_count += 1;
            s.download_count
        }))
    }

    async fn list_share_links(&mut self, file_id: Uuid) -> AppResult<Vec<FileShareLink>> {
        let mut rows: Vec<FileShareLink> = self
            .read()
            .share_links
            .values()
            .filter(|s| s.file_id == file_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}
