//! File services: upload, download, metadata, deletion and grants.

pub mod access;
pub mod download;
pub mod service;
pub mod upload;

use serde::{Deserialize, Serialize};

use huddle_core::AccessLevel;
use huddle_core::traits::storage::ByteStream;
use huddle_entity::file::{File, FileLink};

pub use download::DownloadService;
pub use service::FileService;
pub use upload::{UploadRequest, UploadService};

/// A link with its file and the caller's resolved level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// The placement.
    pub link: FileLink,
    /// The physical file.
    pub file: File,
    /// What the caller may do.
    pub access_level: AccessLevel,
}

/// File metadata and its content stream.
pub struct Download {
    /// File metadata.
    pub file: File,
    /// File content.
    pub stream: ByteStream,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}
