//! Root-commit publishing via content-addressed objects.
//!
//! Every publish builds blobs, one flat tree and a parentless commit, then
//! points the branch at it. The branch therefore holds exactly the files
//! that were published, whatever it pointed at before.

use std::sync::Arc;

use pagesmith_core::{ArtifactSet, CommitRef, FileMode, RepositoryHandle};

use crate::error::{HostingError, PipelineError};
use crate::hosting::{HostingProvider, TreeEntry};

pub struct CommitBuilder {
    hosting: Arc<dyn HostingProvider>,
    branch: String,
}

impl CommitBuilder {
    pub fn new(hosting: Arc<dyn HostingProvider>, branch: impl Into<String>) -> Self {
        Self {
            hosting,
            branch: branch.into(),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Publish `files` as a single root commit and move the branch to it.
    ///
    /// No step is retried; the first failure is returned with its step.
    pub async fn publish(
        &self,
        repo: &RepositoryHandle,
        files: &ArtifactSet,
        message: &str,
    ) -> Result<CommitRef, PipelineError> {
        if files.is_empty() {
            return Err(PipelineError::PublishFailed {
                step: "artifacts".to_string(),
                reason: "artifact set is empty".to_string(),
            });
        }

        let mut entries = Vec::with_capacity(files.len());
        for (path, content) in files.iter() {
            let blob = self
                .hosting
                .create_blob(repo, content)
                .await
                .map_err(|e| PipelineError::publish(format!("blob {path}"), e))?;
            entries.push(TreeEntry {
                path: path.to_string(),
                mode: FileMode::Regular,
                blob,
            });
        }

        let tree = self
            .hosting
            .create_tree(repo, &entries)
            .await
            .map_err(|e| PipelineError::publish("tree", e))?;

        let commit = self
            .hosting
            .create_commit(repo, message, &tree, &[])
            .await
            .map_err(|e| PipelineError::publish("commit", e))?;

        self.move_branch(repo, &commit)
            .await
            .map_err(|e| PipelineError::publish("ref", e))?;

        tracing::debug!(repo = %repo.name, commit = %commit, files = entries.len(), "published");
        Ok(commit)
    }

    async fn move_branch(
        &self,
        repo: &RepositoryHandle,
        commit: &CommitRef,
    ) -> Result<(), HostingError> {
        match self.hosting.create_ref(repo, &self.branch, commit).await {
            Err(HostingError::AlreadyExists(_)) => {
                self.hosting.update_ref(repo, &self.branch, commit, true).await
            }
            other => other,
        }
    }
}
