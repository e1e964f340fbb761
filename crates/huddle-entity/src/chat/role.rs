//! Chat participant roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::group::GroupKind;

/// Role of a participant within one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "chat_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// May manage membership and moderate content.
    Admin,
    /// Regular participant.
    Member,
    /// May read but not post.
    Readonly,
}

impl ChatRole {
    /// Whether this role may add, remove, and re-role others.
    pub fn can_moderate(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role may post messages.
    pub fn can_post(&self) -> bool {
        !matches!(self, Self::Readonly)
    }

    /// The access group this role belongs to.
    pub fn access_group(&self) -> GroupKind {
        if self.can_moderate() {
            GroupKind::ModerateAll
        } else {
            GroupKind::ViewAll
        }
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Readonly => "readonly",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = huddle_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "readonly" => Ok(Self::Readonly),
            _ => Err(huddle_core::AppError::validation(format!(
                "Invalid chat role: '{s}'"
            ))),
        }
    }
}
