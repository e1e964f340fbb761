//! Translating resolver decisions into outcomes.
//!
//! `none` on a chat link from a non-participant is `NotParticipant`; any
//! other shortfall is `AccessDenied` carrying the level that was granted.
//! A tombstoned file or link is `NotFound`.

use uuid::Uuid;

use huddle_auth::{AccessSource, ChatGuard, PermissionResolver};
use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_core::AccessLevel;
use huddle_database::store::StoreTx;

use super::FileInfo;

/// Load a link and its file and require `required` on it.
pub async fn authorize(
    tx: &mut dyn StoreTx,
    resolver: &PermissionResolver,
    link_id: Uuid,
    user_id: Uuid,
    required: AccessLevel,
) -> AppResult<FileInfo> {
    let link = tx
        .find_link(link_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("File link {link_id} not found")))?;
    let file = tx
        .find_file(link.file_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("File {} not found", link.file_id)))?;

    let decision = resolver.resolve(tx, &link, user_id).await?;
    if decision.source == AccessSource::Deleted {
        return Err(AppError::not_found(format!("File link {link_id} was deleted")));
    }
    if !decision.level.allows(required) {
        if decision.level == AccessLevel::None {
            if let Some(chat_id) = link.chat_id {
                if !ChatGuard::is_participant(tx, chat_id, user_id).await? {
                    return Err(AppError::not_participant(format!(
                        "User {user_id} is not in chat {chat_id}"
                    )));
                }
            }
        }
        return Err(AppError::access_denied(
            decision.level,
            format!("{required} access to file link {link_id} required, have {}", decision.level),
        ));
    }

    Ok(FileInfo {
        link,
        file,
        access_level: decision.level,
    })
}
