//! # huddle-auth
//!
//! Authorization for chats, threads and files.
//!
//! ## Modules
//!
//! - `access`: the file link permission resolver, the thread access
//!   cascade, and chat role guards
//! - `password`: Argon2id hashing for share link passwords

pub mod access;
pub mod password;

pub use access::{
    AccessDecision, AccessFacts, AccessSource, ChatGuard, PermissionResolver, ThreadAccessChecker,
};
pub use password::PasswordHasher;
