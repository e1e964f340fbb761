//! Share link management.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use huddle_auth::{PasswordHasher, PermissionResolver};
use huddle_core::config::ShareConfig;
use huddle_core::error::{AppError, ErrorKind};
use huddle_core::events::{DomainEvent, EventPayload, ShareEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_core::AccessLevel;
use huddle_database::store::{Store, StoreTx};
use huddle_entity::file::File;
use huddle_entity::share::FileShareLink;

use super::link::ShareTokenGenerator;
use crate::context::RequestContext;

/// Options for a new share link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateShareLinkRequest {
    /// Password required to download.
    pub password: Option<String>,
    /// Download cap (at least 1).
    pub max_downloads: Option<i32>,
    /// Expiry; defaults to the configured maximum lifetime.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Creates, revokes and lists share links.
#[derive(Clone)]
pub struct ShareService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Event sink.
    events: Arc<dyn EventPublisher>,
    /// Permission resolver.
    resolver: Arc<PermissionResolver>,
    /// Password hasher.
    hasher: Arc<PasswordHasher>,
    /// Token generator.
    tokens: ShareTokenGenerator,
    /// Share policy.
    config: ShareConfig,
}

impl std::fmt::Debug for ShareService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareService").finish()
    }
}

impl ShareService {
    /// Creates a new share service.
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventPublisher>,
        resolver: Arc<PermissionResolver>,
        hasher: Arc<PasswordHasher>,
        config: ShareConfig,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            resolver,
            hasher,
            tokens: ShareTokenGenerator::new(config.token_bytes),
            config,
        }
    }

    /// Create a share link for a file.
    ///
    /// The caller must have uploaded the file or hold `download` on one of
    /// its live links.
    pub async fn create_share_link(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        req: CreateShareLinkRequest,
    ) -> AppResult<FileShareLink> {
        let now = self.clock.now();
        if req.max_downloads.is_some_and(|max| max < 1) {
            return Err(AppError::validation("max_downloads must be at least 1"));
        }
        let expires_at = self.effective_expiry(req.expires_at, now)?;
        let password_hash = req
            .password
            .as_deref()
            .map(|password| self.hasher.hash_password(password))
            .transpose()?;

        let mut tx = self.store.begin().await?;
        let file = live_file(tx.as_mut(), file_id).await?;
        self.require_share_rights(tx.as_mut(), &file, ctx.user_id)
            .await?;

        let share = FileShareLink {
            id: Uuid::new_v4(),
            file_id,
            token: self.tokens.generate_token(),
            password_hash,
            max_downloads: req.max_downloads,
            download_count: 0,
            created_by: ctx.user_id,
            created_at: now,
            expires_at,
            is_active: true,
        };
        tx.insert_share_link(&share).await?;
        tx.commit().await?;

        info!(
            share_id = %share.id,
            file_id = %file_id,
            user_id = %ctx.user_id,
            password = share.is_password_protected(),
            max_downloads = ?share.max_downloads,
            "Share link created"
        );
        self.events.publish(DomainEvent::new(
            now,
            Some(ctx.user_id),
            EventPayload::Share(ShareEvent::Created {
                share_id: share.id,
                file_id,
            }),
        ));
        Ok(share)
    }

    /// Deactivate a share link. Its creator or the file's uploader only.
    pub async fn revoke_share_link(&self, ctx: &RequestContext, share_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let share = tx
            .find_share_link(share_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Share link {share_id} not found")))?;
        let uploader = tx.find_file(share.file_id).await?.map(|f| f.uploaded_by);
        if share.created_by != ctx.user_id && uploader != Some(ctx.user_id) {
            return Err(AppError::new(
                ErrorKind::AccessDenied,
                "Only the creator or the file owner can revoke a share link",
            ));
        }
        if !share.is_active {
            return Ok(());
        }
        tx.deactivate_share_link(share_id).await?;
        tx.commit().await?;

        info!(share_id = %share_id, user_id = %ctx.user_id, "Share link revoked");
        self.events.publish(DomainEvent::new(
            self.clock.now(),
            Some(ctx.user_id),
            EventPayload::Share(ShareEvent::Revoked { share_id }),
        ));
        Ok(())
    }

    /// Share links of a file. The uploader sees all of them; anyone else
    /// with share rights sees the ones they created.
    pub async fn list_share_links(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
    ) -> AppResult<Vec<FileShareLink>> {
        let mut tx = self.store.begin().await?;
        let file = live_file(tx.as_mut(), file_id).await?;
        self.require_share_rights(tx.as_mut(), &file, ctx.user_id)
            .await?;
        let links = tx.list_share_links(file_id).await?;
        if file.uploaded_by == ctx.user_id {
            Ok(links)
        } else {
            Ok(links
                .into_iter()
                .filter(|l| l.created_by == ctx.user_id)
                .collect())
        }
    }

    fn effective_expiry(
        &self,
        requested: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let cap = (self.config.max_expiry_days > 0)
            .then(|| now + Duration::days(i64::from(self.config.max_expiry_days)));
        match (requested, cap) {
            (Some(at), _) if at <= now => {
                Err(AppError::validation("Share link expiry must be in the future"))
            }
            (Some(at), Some(cap)) if at > cap => Err(AppError::validation(format!(
                "Share links may live at most {} days",
                self.config.max_expiry_days
            ))),
            (Some(at), _) => Ok(Some(at)),
            (None, cap) => Ok(cap),
        }
    }

    async fn require_share_rights(
        &self,
        tx: &mut dyn StoreTx,
        file: &File,
        user_id: Uuid,
    ) -> AppResult<()> {
        if file.uploaded_by == user_id {
            return Ok(());
        }
        let mut best = AccessLevel::None;
        for link in tx.list_links_for_file(file.id).await? {
            if link.is_deleted {
                continue;
            }
            let level = self.resolver.resolve(tx, &link, user_id).await?.level;
            if level.allows(AccessLevel::Download) {
                return Ok(());
            }
            best = best.max(level);
        }
        Err(AppError::access_denied(
            best,
            format!("Download access to file {} required to share it", file.id),
        ))
    }
}

async fn live_file(tx: &mut dyn StoreTx, file_id: Uuid) -> AppResult<File> {
    tx.find_file(file_id)
        .await?
        .filter(|f| !f.is_deleted())
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
}
