//! # huddle-storage
//!
//! Byte storage for uploaded files. Providers only move bytes; they never
//! see users or permissions.

pub mod manager;
pub mod mime;
pub mod providers;

pub use manager::StorageManager;
