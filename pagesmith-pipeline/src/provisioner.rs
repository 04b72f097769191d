//! Repository provisioning: create, or destroy and recreate once.

use std::sync::Arc;
use std::time::Duration;

use pagesmith_core::{RepoName, RepositoryHandle};

use crate::error::{HostingError, PipelineError};
use crate::hosting::HostingProvider;

pub struct Provisioner {
    hosting: Arc<dyn HostingProvider>,
    settle_delay: Duration,
}

impl Provisioner {
    pub fn new(hosting: Arc<dyn HostingProvider>, settle_delay: Duration) -> Self {
        Self {
            hosting,
            settle_delay,
        }
    }

    /// Ensure an empty repository called `name` exists.
    ///
    /// A stale repository with the same name is deleted, then creation is
    /// retried exactly once after the settle delay.
    pub async fn provision(&self, name: &RepoName) -> Result<RepositoryHandle, PipelineError> {
        let fail = |source: HostingError| PipelineError::ProvisioningFailed {
            name: name.clone(),
            source,
        };

        match self.hosting.create_repository(name).await {
            Ok(handle) => Ok(handle),
            Err(HostingError::AlreadyExists(_)) => {
                tracing::info!(repo = %name, "repository exists; recreating");
                self.hosting.delete_repository(name).await.map_err(fail)?;
                tokio::time::sleep(self.settle_delay).await;
                self.hosting.create_repository(name).await.map_err(fail)
            }
            Err(e) => Err(fail(e)),
        }
    }
}
