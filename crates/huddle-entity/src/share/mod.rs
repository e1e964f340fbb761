//! Public share-token links.

pub mod model;

pub use model::FileShareLink;
