//! Chat and participant entities.

pub mod model;
pub mod participant;
pub mod role;

pub use model::{Chat, ChatType};
pub use participant::ChatParticipant;
pub use role::ChatRole;
