//! Access groups and the per-chat group binding.

pub mod binding;
pub mod model;
pub mod permission;

pub use binding::ChatFileAccessGroups;
pub use model::{AccessGroup, GroupKind, GroupMember};
pub use permission::FileLinkGroupPermission;
