//! Chat membership store.

pub mod service;

pub use service::MembershipService;
