//! Chat lifecycle and the moderator activity log.

pub mod activity;
pub mod service;

pub use activity::ActivityLog;
pub use service::{ChatService, CreateChatRequest};
