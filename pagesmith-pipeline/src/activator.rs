//! Static-site publication switch.

use std::sync::Arc;

use serde::Serialize;

use pagesmith_core::RepositoryHandle;

use crate::error::{HostingError, PipelineError};
use crate::hosting::HostingProvider;

/// What happened when publication was requested. Never an error: the
/// pipeline carries on either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivationOutcome {
    Enabled,
    AlreadyEnabled,
    Failed { reason: String },
}

impl ActivationOutcome {
    pub fn is_active(&self) -> bool {
        matches!(self, ActivationOutcome::Enabled | ActivationOutcome::AlreadyEnabled)
    }

    /// The stage-tagged error for a failed outcome.
    pub fn error(&self) -> Option<PipelineError> {
        match self {
            ActivationOutcome::Failed { reason } => Some(PipelineError::ActivationFailed {
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

pub struct Activator {
    hosting: Arc<dyn HostingProvider>,
}

impl Activator {
    pub fn new(hosting: Arc<dyn HostingProvider>) -> Self {
        Self { hosting }
    }

    pub async fn activate(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        path: &str,
    ) -> ActivationOutcome {
        match self.hosting.enable_pages(repo, branch, path).await {
            Ok(()) => ActivationOutcome::Enabled,
            Err(HostingError::Conflict(_)) => {
                tracing::debug!(repo = %repo.name, "publication already enabled");
                ActivationOutcome::AlreadyEnabled
            }
            Err(e) => {
                let outcome = ActivationOutcome::Failed {
                    reason: e.to_string(),
                };
                if let Some(err) = outcome.error() {
                    tracing::warn!(
                        repo = %repo.name,
                        stage = err.stage(),
                        error = %err,
                        "enabling publication failed; continuing",
                    );
                }
                outcome
            }
        }
    }
}
