//! # huddle-core
//!
//! Core crate for Huddle. Contains the unified error system, the
//! file access level lattice, configuration schemas, domain events,
//! pagination types, and the traits other crates implement
//! (clock, byte storage, event publishing).
//!
//! This crate has **no** internal dependencies on other Huddle crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use types::access::AccessLevel;
