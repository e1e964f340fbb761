//! Thread hierarchy.

pub mod access;
pub mod conference;
pub mod service;

pub use conference::{ConferenceDirectory, ConferenceState, ConferenceThreadSync, NoConferences};
pub use service::{CreateSubthreadRequest, CreateThreadRequest, ThreadService};
