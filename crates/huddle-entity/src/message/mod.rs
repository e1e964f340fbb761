//! Message entities.

pub mod model;

pub use model::Message;
