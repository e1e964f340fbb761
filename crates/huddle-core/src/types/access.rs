//! The file access lattice returned by the permission resolver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Maximum access a principal holds on a file link.
///
/// Strictly ordered `Delete > Download > View > None`. Holding a level
/// implies every lower level; the resolver always reports the maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// No access.
    #[default]
    None,
    /// Metadata only.
    View,
    /// Metadata and content stream.
    Download,
    /// Stream plus mutation (delete, grant).
    Delete,
}

impl AccessLevel {
    /// Check if this level grants at least `required`.
    pub fn allows(&self, required: AccessLevel) -> bool {
        *self >= required
    }

    /// Derive a level from the three boolean grant columns.
    pub fn from_flags(can_view: bool, can_download: bool, can_delete: bool) -> Self {
        if can_delete {
            Self::Delete
        } else if can_download {
            Self::Download
        } else if can_view {
            Self::View
        } else {
            Self::None
        }
    }

    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::View => "view",
            Self::Download => "download",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "view" => Ok(Self::View),
            "download" => Ok(Self::Download),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::validation(format!("Invalid access level: '{s}'"))),
        }
    }
}
