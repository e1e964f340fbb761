//! File metadata, deletion, forwarding and individual grants.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use huddle_auth::{ChatGuard, PermissionResolver};
use huddle_core::error::AppError;
use huddle_core::events::{DomainEvent, EventPayload, FileEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_core::types::pagination::{PageRequest, PageResponse};
use huddle_core::AccessLevel;
use huddle_database::store::Store;
use huddle_entity::file::{FileLink, FileLinkPermission, FileStatus, GrantFlags};

use super::FileInfo;
use super::access::authorize;
use super::upload::require_poster;
use crate::context::RequestContext;
use crate::propagation::GroupPermissionPropagator;

/// File operations other than streaming.
#[derive(Clone)]
pub struct FileService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Event sink.
    events: Arc<dyn EventPublisher>,
    /// Permission resolver.
    resolver: Arc<PermissionResolver>,
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService").finish()
    }
}

impl FileService {
    /// Creates a new file service.
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

    /// Metadata of a link the caller can at least view.
    pub async fn get_info(&self, ctx: &RequestContext, link_id: Uuid) -> AppResult<FileInfo> {
        let mut tx = self.store.begin().await?;
        authorize(
            tx.as_mut(),
            &self.resolver,
            link_id,
            ctx.user_id,
            AccessLevel::View,
        )
        .await
    }

    /// The caller's level on a link. Unknown links are `none`.
    pub async fn check_access(&self, link_id: Uuid, user_id: Uuid) -> AppResult<AccessLevel> {
        let mut tx = self.store.begin().await?;
        self.resolver.check_access(tx.as_mut(), link_id, user_id).await
    }

    /// Tombstone a link. When the caller uploaded the physical file, the
    /// file is tombstoned as well and every link to it resolves to `none`.
    pub async fn delete(&self, ctx: &RequestContext, link_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let info = authorize(
            tx.as_mut(),
            &self.resolver,
            link_id,
            ctx.user_id,
            AccessLevel::Delete,
        )
        .await?;

        tx.mark_link_deleted(link_id).await?;
        let file_tombstoned = info.file.uploaded_by == ctx.user_id;
        if file_tombstoned {
            tx.update_file_status(info.file.id, FileStatus::Deleted)
                .await?;
        }
        tx.commit().await?;

        info!(
            link_id = %link_id,
            file_id = %info.file.id,
            user_id = %ctx.user_id,
            file_tombstoned,
            "File link deleted"
        );
        self.events.publish(DomainEvent::new(
            self.clock.now(),
            Some(ctx.user_id),
            EventPayload::File(FileEvent::Deleted {
                file_id: info.file.id,
                link_id,
                chat_id: info.link.chat_id,
                file_tombstoned,
            }),
        ));
        Ok(())
    }

    /// Place an existing file into another chat as a new link owned by the
    /// caller. Needs `download` on the source.
    pub async fn forward_into_chat(
        &self,
        ctx: &RequestContext,
        link_id: Uuid,
        chat_id: Uuid,
    ) -> AppResult<FileInfo> {
        let mut tx = self.store.begin().await?;
        let source = authorize(
            tx.as_mut(),
            &self.resolver,
            link_id,
            ctx.user_id,
            AccessLevel::Download,
        )
        .await?;
        require_poster(tx.as_mut(), chat_id, ctx.user_id).await?;

        let now = self.clock.now();
        let link = FileLink::new(source.file.id, Some(chat_id), ctx.user_id, now);
        tx.insert_link(&link).await?;
        tx.upsert_link_permission(&FileLinkPermission::owner(link.id, ctx.user_id, now))
            .await?;
        GroupPermissionPropagator::on_link_created(tx.as_mut(), &link).await?;
        tx.commit().await?;

        info!(
            source_link_id = %link_id,
            link_id = %link.id,
            chat_id = %chat_id,
            user_id = %ctx.user_id,
            "File forwarded"
        );
        self.events.publish(DomainEvent::new(
            now,
            Some(ctx.user_id),
            EventPayload::File(FileEvent::Linked {
                file_id: source.file.id,
                link_id: link.id,
                chat_id: Some(chat_id),
                filename: source.file.filename.clone(),
                size: source.file.size,
            }),
        ));

        Ok(FileInfo {
            link,
            file: source.file,
            access_level: AccessLevel::Delete,
        })
    }

    /// Grant a user individual rights up to `level`, replacing any earlier
    /// grant. Needs `delete` on the link.
    pub async fn grant_link_permission(
        &self,
        ctx: &RequestContext,
        link_id: Uuid,
        grantee_id: Uuid,
        level: AccessLevel,
    ) -> AppResult<FileLinkPermission> {
        if level == AccessLevel::None {
            return Err(AppError::validation(
                "Granting no access is a revocation; use revoke instead",
            ));
        }

        let mut tx = self.store.begin().await?;
        authorize(
            tx.as_mut(),
            &self.resolver,
            link_id,
            ctx.user_id,
            AccessLevel::Delete,
        )
        .await?;

        let flags = GrantFlags::up_to(level);
        let permission = FileLinkPermission {
            file_link_id: link_id,
            user_id: grantee_id,
            can_view: flags.can_view,
            can_download: flags.can_download,
            can_delete: flags.can_delete,
            granted_by: Some(ctx.user_id),
            granted_at: self.clock.now(),
        };
        tx.upsert_link_permission(&permission).await?;
        tx.commit().await?;

        info!(
            link_id = %link_id,
            grantee_id = %grantee_id,
            level = %level,
            granted_by = %ctx.user_id,
            "Link permission granted"
        );
        Ok(permission)
    }

    /// Remove a user's individual grant. Needs `delete` on the link.
    pub async fn revoke_link_permission(
        &self,
        ctx: &RequestContext,
        link_id: Uuid,
        grantee_id: Uuid,
    ) -> AppResult<bool> {
        let mut tx = self.store.begin().await?;
        authorize(
            tx.as_mut(),
            &self.resolver,
            link_id,
            ctx.user_id,
            AccessLevel::Delete,
        )
        .await?;
        let removed = tx.delete_link_permission(link_id, grantee_id).await?;
        tx.commit().await?;

        if removed {
            info!(
                link_id = %link_id,
                grantee_id = %grantee_id,
                revoked_by = %ctx.user_id,
                "Link permission revoked"
            );
        }
        Ok(removed)
    }

    /// Individual grants on a link. Needs `delete` on the link.
    pub async fn list_link_permissions(
        &self,
        ctx: &RequestContext,
        link_id: Uuid,
    ) -> AppResult<Vec<FileLinkPermission>> {
        let mut tx = self.store.begin().await?;
        authorize(
            tx.as_mut(),
            &self.resolver,
            link_id,
            ctx.user_id,
            AccessLevel::Delete,
        )
        .await?;
        tx.list_link_permissions(link_id).await
    }

    /// Live links in a chat that the caller can at least view, newest first.
    pub async fn list_chat_files(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<FileInfo>> {
        let mut tx = self.store.begin().await?;
        ChatGuard::require_participant(tx.as_mut(), chat_id, ctx.user_id).await?;

        let links = tx.list_links_for_chat(chat_id).await?;
        let mut visible = Vec::with_capacity(links.len());
        for link in links {
            let decision = self.resolver.resolve(tx.as_mut(), &link, ctx.user_id).await?;
            if !decision.level.allows(AccessLevel::View) {
                continue;
            }
            let Some(file) = tx.find_file(link.file_id).await? else {
                continue;
            };
            visible.push(FileInfo {
                link,
                file,
                access_level: decision.level,
            });
        }
        Ok(page.paginate(visible))
    }
}
