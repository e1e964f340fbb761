//! Core type definitions used across the Huddle workspace.

pub mod access;
pub mod pagination;

pub use access::AccessLevel;
pub use pagination::{PageRequest, PageResponse};
