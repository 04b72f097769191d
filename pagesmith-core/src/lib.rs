//! Pagesmith core library: domain types, settings persistence, errors.
//!
//! - [`types`]: newtypes, the task model, artifact sets, hosting references
//! - [`error`]: [`ConfigError`], [`ArtifactError`]
//! - [`settings`]: layered load / save / validate

pub mod error;
pub mod settings;
pub mod types;

pub use error::{ArtifactError, ConfigError};
pub use settings::{RunMode, Settings};
pub use types::{
    ArtifactSet, Attachment, BlobRef, CommitRef, FileMode, NotificationPayload, ObjectId,
    RepoName, RepositoryHandle, Task, TaskId, TreeRef, ENTRY_POINT,
};
