//! File download: one access decision, then an unlocked byte stream.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use huddle_auth::PermissionResolver;
use huddle_core::result::AppResult;
use huddle_core::AccessLevel;
use huddle_database::store::Store;
use huddle_storage::StorageManager;

use super::Download;
use super::access::authorize;
use crate::context::RequestContext;

/// Streams file content after a `download`-level check.
#[derive(Clone)]
pub struct DownloadService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Byte storage.
    storage: Arc<StorageManager>,
    /// Permission resolver.
    resolver: Arc<PermissionResolver>,
}

impl std::fmt::Debug for DownloadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadService").finish()
    }
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<StorageManager>,
        resolver: Arc<PermissionResolver>,
    ) -> Self {
        Self {
            store,
            storage,
            resolver,
        }
    }

    /// Download the file behind a link.
    ///
    /// The transaction is released before the stream is opened, so a slow
    /// or abandoned download holds no lock.
    pub async fn download(&self, ctx: &RequestContext, link_id: Uuid) -> AppResult<Download> {
        let info = {
            let mut tx = self.store.begin().await?;
            authorize(
                tx.as_mut(),
                &self.resolver,
                link_id,
                ctx.user_id,
                AccessLevel::Download,
            )
            .await?
        };

        let stream = self.storage.provider().read(&info.file.storage_path).await?;
        debug!(
            link_id = %link_id,
            file_id = %info.file.id,
            user_id = %ctx.user_id,
            "Download started"
        );
        Ok(Download {
            file: info.file,
            stream,
        })
    }
}
