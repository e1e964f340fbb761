//! File upload: standalone and into a chat.
//!
//! Bytes are streamed to storage before any row is written, and the access
//! decision is made again inside the metadata transaction. If that
//! transaction fails the bytes are removed, so an aborted upload leaves no
//! `File` or `FileLink` row behind.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use huddle_auth::ChatGuard;
use huddle_core::error::{AppError, ErrorKind};
use huddle_core::events::{DomainEvent, EventPayload, FileEvent};
use huddle_core::result::AppResult;
use huddle_core::traits::storage::ByteStream;
use huddle_core::traits::{Clock, EventPublisher};
use huddle_core::AccessLevel;
use huddle_database::store::{Store, StoreTx};
use huddle_entity::chat::model::validate_name;
use huddle_entity::file::{File, FileLink, FileLinkPermission, FileStatus, sanitize_filename};
use huddle_storage::StorageManager;
use huddle_storage::mime::resolve_content_type;

use super::FileInfo;
use crate::context::RequestContext;
use crate::propagation::GroupPermissionPropagator;

/// Upload parameters.
pub struct UploadRequest {
    /// Name as supplied by the client.
    pub filename: String,
    /// Declared MIME type; may be empty.
    pub content_type: String,
    /// Declared size in bytes. The stream must match it exactly.
    pub size: u64,
    /// File content.
    pub stream: ByteStream,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Handles uploads.
#[derive(Clone)]
pub struct UploadService {
    /// Transactional store.
    store: Arc<dyn Store>,
    /// Byte storage.
    storage: Arc<StorageManager>,
    /// Time source for `uploaded_at`.
    clock: Arc<dyn Clock>,
    /// Event sink.
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService").finish()
    }
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<StorageManager>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            storage,
            clock,
            events,
        }
    }

    /// Upload a standalone file. Any authenticated user may do this.
    pub async fn upload(&self, ctx: &RequestContext, req: UploadRequest) -> AppResult<FileInfo> {
        self.store_upload(ctx, req, None).await
    }

    /// Upload a file into a chat. The chat's groups are granted on the new
    /// link before this returns.
    pub async fn upload_into_chat(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        req: UploadRequest,
    ) -> AppResult<FileInfo> {
        // Reject outsiders before any bytes are written.
        {
            let mut tx = self.store.begin().await?;
            require_poster(tx.as_mut(), chat_id, ctx.user_id).await?;
        }
        self.store_upload(ctx, req, Some(chat_id)).await
    }

    async fn store_upload(
        &self,
        ctx: &RequestContext,
        req: UploadRequest,
        chat_id: Option<Uuid>,
    ) -> AppResult<FileInfo> {
        let max = self.storage.max_upload_size_bytes();
        if req.size > max {
            return Err(AppError::validation(format!(
                "File exceeds maximum upload size of {max} bytes"
            )));
        }
        validate_name("Filename", &req.filename)?;

        let file_id = Uuid::new_v4();
        let now = self.clock.now();
        let storage_path = File::storage_path_for(file_id, now);

        let overflow = Arc::new(AtomicBool::new(false));
        let bounded = bounded_stream(req.stream, req.size, Arc::clone(&overflow));
        let written = match self
            .storage
            .provider()
            .write_stream(&storage_path, bounded)
            .await
        {
            Ok(n) => n,
            Err(_) if overflow.load(Ordering::Relaxed) => {
                return Err(size_mismatch(req.size));
            }
            Err(e) => return Err(e),
        };
        if written != req.size {
            self.discard(&storage_path).await;
            return Err(size_mismatch(req.size));
        }

        let file = File {
            id: file_id,
            filename: sanitize_filename(&req.filename),
            content_type: resolve_content_type(&req.content_type, &req.filename),
            original_filename: req.filename,
            size: written as i64,
            storage_path,
            uploaded_by: ctx.user_id,
            uploaded_at: now,
            status: FileStatus::Active,
        };
        let link = FileLink::new(file.id, chat_id, ctx.user_id, now);

        if let Err(e) = self.record(&file, &link).await {
            self.discard(&file.storage_path).await;
            return Err(e);
        }

        info!(
            user_id = %ctx.user_id,
            file_id = %file.id,
            link_id = %link.id,
            chat_id = ?chat_id,
            size = file.size,
            "Upload completed"
        );
        self.events.publish(DomainEvent::new(
            now,
            Some(ctx.user_id),
            EventPayload::File(FileEvent::Linked {
                file_id: file.id,
                link_id: link.id,
                chat_id,
                filename: file.filename.clone(),
                size: file.size,
            }),
        ));

        Ok(FileInfo {
            link,
            file,
            access_level: AccessLevel::Delete,
        })
    }

    async fn record(&self, file: &File, link: &FileLink) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if let Some(chat_id) = link.chat_id {
            require_poster(tx.as_mut(), chat_id, link.uploaded_by).await?;
        }
        tx.insert_file(file).await?;
        tx.insert_link(link).await?;
        tx.upsert_link_permission(&FileLinkPermission::owner(
            link.id,
            link.uploaded_by,
            link.uploaded_at,
        ))
        .await?;
        GroupPermissionPropagator::on_link_created(tx.as_mut(), link).await?;
        tx.commit().await
    }

    async fn discard(&self, path: &str) {
        if let Err(e) = self.storage.provider().delete(path).await {
            warn!(path = %path, error = %e, "Failed to remove bytes of aborted upload");
        }
    }
}

/// Require a participant who may post into the chat.
pub(crate) async fn require_poster(
    tx: &mut dyn StoreTx,
    chat_id: Uuid,
    user_id: Uuid,
) -> AppResult<()> {
    let participant = ChatGuard::require_participant(tx, chat_id, user_id).await?;
    if participant.role.can_post() {
        Ok(())
    } else {
        Err(AppError::new(
            ErrorKind::AccessDenied,
            "Read-only participants cannot share files",
        ))
    }
}

fn size_mismatch(declared: u64) -> AppError {
    AppError::validation(format!(
        "Uploaded content does not match the declared size of {declared} bytes"
    ))
}

/// Fail the stream as soon as it yields more than `limit` bytes.
fn bounded_stream(stream: ByteStream, limit: u64, overflow: Arc<AtomicBool>) -> ByteStream {
    let mut seen: u64 = 0;
    Box::pin(stream.map(move |chunk| {
        let chunk = chunk?;
        seen += chunk.len() as u64;
        if seen > limit {
            overflow.store(true, Ordering::Relaxed);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "stream longer than declared size",
            ));
        }
        Ok(chunk)
    }))
}
