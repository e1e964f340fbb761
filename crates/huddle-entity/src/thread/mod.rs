//! Thread entities.

pub mod model;
pub mod participant;

pub use model::{CONFERENCE_THREAD_TITLE, MAX_THREAD_DEPTH, SYSTEM_THREAD_TITLE, Thread, ThreadType};
pub use participant::ThreadParticipant;
