//! Turning a failed thread check into the right error.

use uuid::Uuid;

use huddle_auth::{ChatGuard, ThreadAccessChecker};
use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_database::store::StoreTx;
use huddle_entity::thread::Thread;

/// Load a thread or fail with `NotFound`.
pub(crate) async fn load_thread(tx: &mut dyn StoreTx, thread_id: Uuid) -> AppResult<Thread> {
    tx.find_thread(thread_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Thread {thread_id} not found")))
}

/// Require read access to a loaded thread.
///
/// Outsiders to the chat get `NotParticipant`; participants blocked by a
/// restricted thread get `AccessDenied`.
pub(crate) async fn require_thread_access(
    tx: &mut dyn StoreTx,
    thread: &Thread,
    user_id: Uuid,
) -> AppResult<()> {
    if ThreadAccessChecker::check_loaded(tx, thread.clone(), user_id).await? {
        return Ok(());
    }
    if ChatGuard::is_participant(tx, thread.chat_id, user_id).await? {
        Err(AppError::new(
            ErrorKind::AccessDenied,
            format!("Thread {} is restricted", thread.id),
        ))
    } else {
        Err(AppError::not_participant(format!(
            "User {user_id} is not in chat {}",
            thread.chat_id
        )))
    }
}
