//! Public share links.

pub mod access;
pub mod link;
pub mod service;

pub use access::ShareAccessService;
pub use link::ShareTokenGenerator;
pub use service::{CreateShareLinkRequest, ShareService};
