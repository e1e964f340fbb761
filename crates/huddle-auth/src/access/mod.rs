//! Access decisions for file links, threads and chats.

pub mod chat;
pub mod resolver;
pub mod thread;

pub use chat::ChatGuard;
pub use resolver::{AccessDecision, AccessFacts, AccessSource, PermissionResolver};
pub use thread::ThreadAccessChecker;
