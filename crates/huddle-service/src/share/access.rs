//! Anonymous download through a share token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use huddle_auth::PasswordHasher;
use huddle_core::error::{AppError, ErrorKind};
use huddle_core::events::{DomainEvent, EventPayload, ShareEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_database::store::{Store, StoreTx};
use huddle_entity::share::FileShareLink;
use huddle_storage::StorageManager;

use crate::file::Download;

/// Validates share tokens and streams the shared file.
///
/// Chat membership plays no part here.
#[derive(Clone)]
pub struct ShareAccessService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Byte storage.
    storage: Arc<StorageManager>,
    /// Time source for expiry.
    clock: Arc<dyn Clock>,
    /// Event sink.
    events: Arc<dyn EventPublisher>,
    /// Password verification.
    hasher: Arc<PasswordHasher>,
}

impl std::fmt::Debug for ShareAccessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareAccessService").finish()
    }
}

impl ShareAccessService {
    /// Creates a new share access service.
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<StorageManager>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventPublisher>,
        hasher: Arc<PasswordHasher>,
    ) -> Self {
        Self {
            store,
            storage,
            clock,
            events,
            hasher,
        }
    }

    /// Download through a token.
    ///
    /// Checks run in a fixed order: unknown token, revoked, expired,
    /// exhausted, password, tombstoned file. The password is verified on the
    /// blocking pool with no transaction open; the link is then read again
    /// and the download is counted with a conditional increment, so
    /// concurrent requests never pass the cap.
    pub async fn download_by_token(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> AppResult<Download> {
        let now = self.clock.now();
        let share = {
            let mut tx = self.store.begin().await?;
            available_share(tx.as_mut(), token, now).await?
        };
        self.check_password(&share, password).await?;

        let mut tx = self.store.begin().await?;
        let share = available_share(tx.as_mut(), token, now).await?;
        let file = tx
            .find_file(share.file_id)
            .await?
            .filter(|f| !f.is_deleted())
            .ok_or_else(|| AppError::not_found("Shared file no longer exists"))?;

        let Some(download_count) = tx.try_consume_download(share.id).await? else {
            warn!(share_id = %share.id, "Share link download cap reached");
            return Err(AppError::new(
                ErrorKind::ShareLinkExhausted,
                "Share link download limit reached",
            ));
        };
        tx.commit().await?;

        let stream = self.storage.provider().read(&file.storage_path).await?;
        info!(
            share_id = %share.id,
            file_id = %file.id,
            download_count,
            "Shared file downloaded"
        );
        self.events.publish(DomainEvent::new(
            now,
            None,
            EventPayload::Share(ShareEvent::Downloaded {
                share_id: share.id,
                download_count,
                max_downloads: share.max_downloads,
            }),
        ));
        Ok(Download { file, stream })
    }

    async fn check_password(&self, share: &FileShareLink, password: Option<&str>) -> AppResult<()> {
        let Some(stored) = share.password_hash.clone() else {
            return Ok(());
        };
        let hasher = Arc::clone(&self.hasher);
        let candidate = password.map(str::to_owned);
        let admitted = tokio::task::spawn_blocking(move || {
            hasher.admits(Some(stored.as_str()), candidate.as_deref())
        })
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Internal, "Share password check was cancelled", e)
        })??;

        if !admitted {
            warn!(share_id = %share.id, "Share link password rejected");
            return Err(AppError::new(
                ErrorKind::ShareLinkBadPassword,
                "Share link password is missing or wrong",
            ));
        }
        Ok(())
    }
}

/// Find a share link by token and check revocation, expiry and cap.
async fn available_share(
    tx: &mut dyn StoreTx,
    token: &str,
    now: DateTime<Utc>,
) -> AppResult<FileShareLink> {
    let share = tx
        .find_share_link_by_token(token)
        .await?
        .ok_or_else(|| AppError::not_found("Share link not found"))?;
    if let Err(e) = share.check_available(now) {
        warn!(share_id = %share.id, reason = %e.kind, "Share link rejected");
        return Err(e);
    }
    Ok(share)
}

