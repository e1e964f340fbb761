//! Unified application error types for Huddle.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The authorization-facing kinds are
//! deliberately fine-grained: a caller must be able to tell "you never had
//! access" from "you are not in this chat" from "this content is gone".

use std::fmt;
use thiserror::Error;

use crate::types::access::AccessLevel;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A chat, thread, message, file, link, or token does not exist (or is gone).
    NotFound,
    /// The entity already exists (duplicate participant add).
    AlreadyExists,
    /// Authenticated, but the resolved rights are insufficient.
    AccessDenied,
    /// The actor has no relationship to the chat at all.
    NotParticipant,
    /// A write was attempted on a system thread.
    ReadOnlyThread,
    /// Subthread nesting would exceed the depth cap.
    MaxDepthExceeded,
    /// The share link is past its expiry.
    ShareLinkExpired,
    /// The share link was deactivated.
    ShareLinkRevoked,
    /// The share link reached its download cap.
    ShareLinkExhausted,
    /// The share link password is missing or wrong.
    ShareLinkBadPassword,
    /// Group synchronisation failed; the triggering change was rolled back.
    PropagationFailure,
    /// Input validation failed.
    Validation,
    /// The operation conflicts with current state (last admin, archived thread).
    Conflict,
    /// A database error occurred.
    Database,
    /// A storage I/O error occurred.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// HTTP-grade status code that a calling handler should render.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::AlreadyExists | Self::Conflict | Self::ReadOnlyThread => 409,
            Self::AccessDenied | Self::NotParticipant => 403,
            Self::MaxDepthExceeded | Self::Validation => 422,
            Self::ShareLinkExpired | Self::ShareLinkRevoked | Self::ShareLinkExhausted => 410,
            Self::ShareLinkBadPassword => 401,
            Self::PropagationFailure
            | Self::Database
            | Self::Storage
            | Self::Configuration
            | Self::Serialization
            | Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::NotParticipant => "NOT_PARTICIPANT",
            Self::ReadOnlyThread => "READ_ONLY_THREAD",
            Self::MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
            Self::ShareLinkExpired => "SHARE_LINK_EXPIRED",
            Self::ShareLinkRevoked => "SHARE_LINK_REVOKED",
            Self::ShareLinkExhausted => "SHARE_LINK_EXHAUSTED",
            Self::ShareLinkBadPassword => "SHARE_LINK_BAD_PASSWORD",
            Self::PropagationFailure => "PROPAGATION_FAILURE",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::Database => "DATABASE",
            Self::Storage => "STORAGE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::Internal => "INTERNAL",
        };
        write!(f, "{s}")
    }
}

/// The unified application error used throughout Huddle.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// The level the resolver granted, for `AccessDenied` errors.
    pub access_level: Option<AccessLevel>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            access_level: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            access_level: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an already-exists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    /// Create an access-denied error carrying the level that was resolved.
    pub fn access_denied(level: AccessLevel, message: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::AccessDenied, message);
        err.access_level = Some(level);
        err
    }

    /// Create a not-participant error.
    pub fn not_participant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotParticipant, message)
    }

    /// Create a read-only-thread error.
    pub fn read_only_thread(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReadOnlyThread, message)
    }

    /// Create a max-depth error.
    pub fn max_depth_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MaxDepthExceeded, message)
    }

    /// Create a propagation-failure error wrapping the failed group operation.
    pub fn propagation(message: impl Into<String>, cause: AppError) -> Self {
        Self::with_source(ErrorKind::PropagationFailure, message, cause)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            access_level: self.access_level,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
