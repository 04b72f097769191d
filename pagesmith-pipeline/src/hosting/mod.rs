//! Repository hosting boundary.
//!
//! Everything the pipeline asks of a hosting service goes through
//! [`HostingProvider`]. Two implementations ship:
//!
//! - [`GitHubHosting`]: GitHub REST v3 over `reqwest`.
//! - [`InMemoryHosting`]: a content-addressed store for dry runs and tests.

pub mod github;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pagesmith_core::{BlobRef, CommitRef, FileMode, RepoName, RepositoryHandle, TreeRef};

use crate::error::HostingError;

pub use github::GitHubHosting;
pub use memory::InMemoryHosting;

/// One path in a flat tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: FileMode,
    pub blob: BlobRef,
}

/// Operations on the hosting boundary, for call accounting and failure
/// injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostingOp {
    CreateRepository,
    DeleteRepository,
    CreateBlob,
    CreateTree,
    CreateCommit,
    CreateRef,
    UpdateRef,
    EnablePages,
}

#[async_trait]
pub trait HostingProvider: Send + Sync {
    /// Create an empty public repository with no initial commit.
    ///
    /// Returns [`HostingError::AlreadyExists`] when the name is taken.
    async fn create_repository(&self, name: &RepoName) -> Result<RepositoryHandle, HostingError>;

    async fn delete_repository(&self, name: &RepoName) -> Result<(), HostingError>;

    async fn create_blob(
        &self,
        repo: &RepositoryHandle,
        content: &str,
    ) -> Result<BlobRef, HostingError>;

    async fn create_tree(
        &self,
        repo: &RepositoryHandle,
        entries: &[TreeEntry],
    ) -> Result<TreeRef, HostingError>;

    async fn create_commit(
        &self,
        repo: &RepositoryHandle,
        message: &str,
        tree: &TreeRef,
        parents: &[CommitRef],
    ) -> Result<CommitRef, HostingError>;

    /// Create `refs/heads/<branch>`; [`HostingError::AlreadyExists`] if present.
    async fn create_ref(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        commit: &CommitRef,
    ) -> Result<(), HostingError>;

    /// Move an existing branch, ignoring fast-forward rules when `force`.
    async fn update_ref(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        commit: &CommitRef,
        force: bool,
    ) -> Result<(), HostingError>;

    /// Serve `path` of `branch` as a static site.
    ///
    /// Returns [`HostingError::Conflict`] when publication is already on.
    async fn enable_pages(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        path: &str,
    ) -> Result<(), HostingError>;
}
