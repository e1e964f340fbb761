//! # huddle-service
//!
//! Business logic service layer for Huddle. Each service opens one store
//! transaction per operation, applies the authorization rules from
//! `huddle-auth`, keeps access groups in step with membership through the
//! propagator, and publishes domain events once the transaction commits.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod chat;
pub mod container;
pub mod context;
pub mod events;
pub mod file;
pub mod membership;
pub mod message;
pub mod propagation;
pub mod share;
pub mod thread;

pub use chat::{ActivityLog, ChatService, CreateChatRequest};
pub use container::ServiceContainer;
pub use context::RequestContext;
pub use events::EventBus;
pub use file::{Download, DownloadService, FileInfo, FileService, UploadRequest, UploadService};
pub use membership::MembershipService;
pub use message::{MessageService, SendMessageRequest};
pub use propagation::{AccessGroupBinding, GroupPermissionPropagator};
pub use share::{CreateShareLinkRequest, ShareAccessService, ShareService, ShareTokenGenerator};
pub use thread::{
    ConferenceDirectory, ConferenceState, ConferenceThreadSync, CreateSubthreadRequest,
    CreateThreadRequest, NoConferences, ThreadService,
};
