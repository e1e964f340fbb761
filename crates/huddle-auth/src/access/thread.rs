//! Cascading thread access check.
//!
//! A system thread is visible to every chat participant. Otherwise each
//! restricted thread on the way up requires an explicit thread participant
//! row, and the walk ends at the top-level thread with chat membership.
//! Access is the AND of every restriction along the chain; membership of a
//! child thread never compensates for a restricted ancestor.

use tracing::{debug, warn};
use uuid::Uuid;

use huddle_core::result::AppResult;
use huddle_database::store::StoreTx;
use huddle_entity::thread::{MAX_THREAD_DEPTH, Thread};

/// Evaluates [`ThreadAccessChecker::check_thread_access`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadAccessChecker;

impl ThreadAccessChecker {
    /// Whether the user may read the thread. Unknown threads are `false`.
    pub async fn check_thread_access(
        tx: &mut dyn StoreTx,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let Some(thread) = tx.find_thread(thread_id).await? else {
            return Ok(false);
        };
        Self::check_loaded(tx, thread, user_id).await
    }

    /// Same check starting from an already loaded thread.
    pub async fn check_loaded(
        tx: &mut dyn StoreTx,
        thread: Thread,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let chat_id = thread.chat_id;
        let mut current = thread;

        // The depth cap bounds the chain; one extra step tolerates nothing deeper.
        for _ in 0..=MAX_THREAD_DEPTH {
            if current.is_system() {
                return Ok(tx.find_participant(chat_id, user_id).await?.is_some());
            }
            if current.restricted_participants
                && !tx.is_thread_participant(current.id, user_id).await?
            {
                debug!(
                    thread_id = %current.id,
                    user_id = %user_id,
                    "Restricted thread blocks access"
                );
                return Ok(false);
            }
            match current.parent_thread_id {
                None => return Ok(tx.find_participant(chat_id, user_id).await?.is_some()),
                Some(parent_id) => match tx.find_thread(parent_id).await? {
                    Some(parent) => current = parent,
                    None => return Ok(false),
                },
            }
        }

        warn!(chat_id = %chat_id, "Thread chain exceeds the depth cap");
        Ok(false)
    }
}
