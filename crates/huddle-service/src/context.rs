//! Request context carrying the acting user.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for the current authenticated call.
///
/// Built by the calling handler from its own authentication and passed
/// into service methods so that every operation knows *who* is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: Uuid,
    /// Correlation ID for logs.
    pub request_id: Uuid,
}

impl RequestContext {
    /// Creates a new request context with a fresh correlation ID.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            request_id: Uuid::new_v4(),
        }
    }

    /// Whether the actor is the given user.
    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}
