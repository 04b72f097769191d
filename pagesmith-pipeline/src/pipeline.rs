//! Pipeline orchestrator: one task, start to finish.
//!
//! ```text
//! Generating → Provisioning → Publishing → Activating → AwaitingReadiness → Notifying → Done
//!      └────────────┴─────────────┴──→ Failed
//! ```
//!
//! Activation and delivery failures are recorded and logged but never move
//! the run to `Failed`. Nothing here returns an error: callers get a
//! [`PipelineReport`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use pagesmith_core::{CommitRef, NotificationPayload, RepositoryHandle, Settings, Task, TaskId};
use pagesmith_generator::{ArtifactGenerator, GenerationRequest};

use crate::activator::{ActivationOutcome, Activator};
use crate::commit::CommitBuilder;
use crate::error::PipelineError;
use crate::hosting::HostingProvider;
use crate::notifier::{CallbackTransport, Notifier};
use crate::provisioner::Provisioner;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Generating,
    Provisioning,
    Publishing,
    Activating,
    AwaitingReadiness,
    Notifying,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Generating => "generating",
            PipelineState::Provisioning => "provisioning",
            PipelineState::Publishing => "publishing",
            PipelineState::Activating => "activating",
            PipelineState::AwaitingReadiness => "awaiting_readiness",
            PipelineState::Notifying => "notifying",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub branch: String,
    pub pages_path: String,
    pub readiness_delay: Duration,
    pub settle_delay: Duration,
    pub notify_attempts: u32,
    pub notify_base_delay: Duration,
    pub notify_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            branch: settings.pipeline.branch.clone(),
            pages_path: settings.pipeline.pages_path.clone(),
            readiness_delay: settings.pipeline.readiness_delay(),
            settle_delay: settings.pipeline.settle_delay(),
            notify_attempts: settings.notifier.max_attempts,
            notify_base_delay: settings.notifier.base_delay(),
            notify_timeout: settings.notifier.timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Failed { attempts: u32, reason: String },
}

/// The stage a run died in and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub stage: &'static str,
    pub message: String,
}

/// Everything one run produced, including partial outputs of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub task: TaskId,
    pub round: u32,
    pub visited: Vec<PipelineState>,
    pub repository: Option<RepositoryHandle>,
    pub commit: Option<CommitRef>,
    pub files: Vec<String>,
    pub activation: Option<ActivationOutcome>,
    pub payload: Option<NotificationPayload>,
    pub delivery: Option<DeliveryOutcome>,
    pub failure: Option<Failure>,
}

impl PipelineReport {
    fn new(task: &Task) -> Self {
        Self {
            task: task.id.clone(),
            round: task.round,
            visited: Vec::new(),
            repository: None,
            commit: None,
            files: Vec::new(),
            activation: None,
            payload: None,
            delivery: None,
            failure: None,
        }
    }

    /// Last state entered; `Generating` before the run starts.
    pub fn terminal(&self) -> PipelineState {
        self.visited.last().copied().unwrap_or(PipelineState::Generating)
    }

    pub fn succeeded(&self) -> bool {
        self.terminal() == PipelineState::Done
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::info!(task = %self.task, round = self.round, stage = %state, "pipeline stage");
        self.visited.push(state);
    }

    fn fail(mut self, err: PipelineError) -> Self {
        tracing::error!(
            task = %self.task,
            round = self.round,
            stage = err.stage(),
            error = %err,
            "pipeline failed",
        );
        self.failure = Some(Failure {
            stage: err.stage(),
            message: err.to_string(),
        });
        self.enter(PipelineState::Failed);
        self
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Drives generator, provisioner, commit builder, activator and notifier in
/// order. Immutable after construction; share it through an `Arc` and call
/// [`run`](Pipeline::run) concurrently for different tasks.
pub struct Pipeline {
    generator: Arc<dyn ArtifactGenerator>,
    provisioner: Provisioner,
    commits: CommitBuilder,
    activator: Activator,
    notifier: Notifier,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn ArtifactGenerator>,
        hosting: Arc<dyn HostingProvider>,
        transport: Arc<dyn CallbackTransport>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            generator,
            provisioner: Provisioner::new(hosting.clone(), config.settle_delay),
            commits: CommitBuilder::new(hosting.clone(), config.branch.clone()),
            activator: Activator::new(hosting),
            notifier: Notifier::new(
                transport,
                config.notify_attempts,
                config.notify_base_delay,
                config.notify_timeout,
            ),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, task: &Task) -> PipelineReport {
        let mut report = PipelineReport::new(task);

        report.enter(PipelineState::Generating);
        let request = GenerationRequest::from_task(task);
        let files = match self.generator.generate(&request).await {
            Ok(files) => files,
            Err(e) => return report.fail(PipelineError::GenerationFailed(e)),
        };
        report.files = files.paths().map(str::to_string).collect();

        report.enter(PipelineState::Provisioning);
        let repo = match self.provisioner.provision(&task.repo_name()).await {
            Ok(repo) => repo,
            Err(e) => return report.fail(e),
        };
        report.repository = Some(repo.clone());

        report.enter(PipelineState::Publishing);
        let commit = match self.commits.publish(&repo, &files, &task.commit_message()).await {
            Ok(commit) => commit,
            Err(e) => return report.fail(e),
        };
        report.commit = Some(commit.clone());

        report.enter(PipelineState::Activating);
        let activation = self
            .activator
            .activate(&repo, self.commits.branch(), &self.config.pages_path)
            .await;
        report.activation = Some(activation);

        report.enter(PipelineState::AwaitingReadiness);
        tokio::time::sleep(self.config.readiness_delay).await;

        report.enter(PipelineState::Notifying);
        let payload = NotificationPayload::new(task, &repo, &commit);
        let delivery = match self.notifier.notify(&payload, &task.callback_url).await {
            Ok(receipt) => DeliveryOutcome::Delivered {
                attempts: receipt.attempts,
            },
            Err(e) => {
                tracing::error!(
                    task = %task.id,
                    round = task.round,
                    stage = e.stage(),
                    error = %e,
                    "completion callback not delivered",
                );
                let attempts = match e {
                    PipelineError::DeliveryFailed { attempts, .. } => attempts,
                    _ => self.config.notify_attempts,
                };
                DeliveryOutcome::Failed {
                    attempts,
                    reason: e.to_string(),
                }
            }
        };
        report.payload = Some(payload);
        report.delivery = Some(delivery);

        report.enter(PipelineState::Done);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_settings_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.branch, "main");
        assert_eq!(config.pages_path, "/");
        assert_eq!(config.readiness_delay, Duration::from_secs(120));
        assert_eq!(config.settle_delay, Duration::from_secs(3));
        assert_eq!(config.notify_attempts, 5);
        assert_eq!(config.notify_base_delay, Duration::from_secs(1));
        assert_eq!(config.notify_timeout, Duration::from_secs(10));
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::AwaitingReadiness.is_terminal());
        assert_eq!(PipelineState::AwaitingReadiness.to_string(), "awaiting_readiness");
    }
}
