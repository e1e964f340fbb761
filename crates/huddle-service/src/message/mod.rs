//! Chat messages.

pub mod service;
pub(crate) mod timeline;

pub use service::{MessageService, SendMessageRequest};
