//! Core traits defined in `huddle-core` and implemented by other crates.

pub mod clock;
pub mod events;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::EventPublisher;
pub use storage::{ByteStream, StorageProvider};
