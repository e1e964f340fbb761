//! # huddle-entity
//!
//! Domain entity models for Huddle. Every struct in this crate represents a
//! database table row or a domain value object. Row structs derive
//! `sqlx::FromRow`; enums map onto PostgreSQL enum types.

pub mod chat;
pub mod file;
pub mod group;
pub mod message;
pub mod share;
pub mod thread;
