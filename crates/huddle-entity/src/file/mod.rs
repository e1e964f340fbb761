//! File, file link, and individual permission entities.

pub mod link;
pub mod model;
pub mod permission;

pub use link::FileLink;
pub use model::{File, FileStatus, sanitize_filename};
pub use permission::{FileLinkPermission, GrantFlags};
