//! # pagesmith-pipeline
//!
//! The deployment pipeline: provision a repository, publish an artifact set
//! as a single root commit, switch on static hosting, wait, and report back
//! to the caller's callback URL.
//!
//! Build a [`Pipeline`] once from its collaborators and call
//! [`Pipeline::run`] per task. Hosting is behind [`HostingProvider`] and the
//! callback behind [`CallbackTransport`], so both can be swapped for the
//! in-memory versions in dry runs and tests.

pub mod activator;
pub mod commit;
pub mod error;
pub mod hosting;
pub mod notifier;
pub mod pipeline;
pub mod provisioner;

pub use activator::{ActivationOutcome, Activator};
pub use commit::CommitBuilder;
pub use error::{HostingError, PipelineError, TransportError};
pub use hosting::{GitHubHosting, HostingOp, HostingProvider, InMemoryHosting, TreeEntry};
pub use notifier::{backoff_delay, CallbackTransport, DeliveryReceipt, Notifier, ReqwestTransport};
pub use pipeline::{DeliveryOutcome, Failure, Pipeline, PipelineConfig, PipelineReport, PipelineState};
pub use provisioner::Provisioner;
