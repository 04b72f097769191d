//! Error types for pagesmith-pipeline.

use thiserror::Error;

use pagesmith_core::RepoName;
use pagesmith_generator::GenerateError;

/// Failures reported by a [`HostingProvider`](crate::hosting::HostingProvider).
#[derive(Debug, Error)]
pub enum HostingError {
    /// A repository or reference with this name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The requested state is already in place (e.g. publication enabled).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response from the hosting API.
    #[error("hosting API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid hosting token: {0}")]
    InvalidToken(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A callback POST that never produced an HTTP status.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Stage-tagged failures of one pipeline run.
///
/// None of these reach the original caller; the orchestrator logs them and
/// records them in the [`PipelineReport`](crate::PipelineReport).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("generation failed: {0}")]
    GenerationFailed(#[source] GenerateError),

    #[error("provisioning `{name}` failed: {source}")]
    ProvisioningFailed {
        name: RepoName,
        #[source]
        source: HostingError,
    },

    /// `step` is one of `artifacts`, `blob <path>`, `tree`, `commit`, `ref`.
    #[error("publish failed at {step}: {reason}")]
    PublishFailed { step: String, reason: String },

    #[error("activation failed: {reason}")]
    ActivationFailed { reason: String },

    #[error("delivery failed after {attempts} attempts: {last_error}")]
    DeliveryFailed { attempts: u32, last_error: String },
}

impl PipelineError {
    /// Stage label used in logs and reports.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::GenerationFailed(_) => "generating",
            PipelineError::ProvisioningFailed { .. } => "provisioning",
            PipelineError::PublishFailed { .. } => "publishing",
            PipelineError::ActivationFailed { .. } => "activating",
            PipelineError::DeliveryFailed { .. } => "notifying",
        }
    }

    pub(crate) fn publish(step: impl Into<String>, source: HostingError) -> Self {
        PipelineError::PublishFailed {
            step: step.into(),
            reason: source.to_string(),
        }
    }
}
