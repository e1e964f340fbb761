//! # huddle-database
//!
//! Persistence for Huddle. Services talk to a [`Store`] and do all of their
//! reads and writes for one operation inside a single [`StoreTx`]. Two
//! backends implement the traits:
//!
//! - [`repositories::PgStore`]: PostgreSQL via `sqlx`, with row and advisory
//!   locks at the membership serialization points.
//! - [`memory::MemoryStore`]: a single-process store whose transactions are
//!   serialized by a tokio mutex and staged copy-on-write.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use repositories::PgStore;
pub use store::{
    ChatTx, FileTx, GroupTx, MessageTx, ParticipantTx, ShareTx, Store, StoreTx, ThreadTx,
};
