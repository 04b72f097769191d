//! # pagesmith-generator
//!
//! Turns a task brief into the [`ArtifactSet`](pagesmith_core::ArtifactSet)
//! that gets published.
//!
//! The pipeline only sees the [`ArtifactGenerator`] trait. The shipped
//! implementation, [`TemplateGenerator`], renders embedded Tera templates
//! (optionally overridden from a user directory) into `index.html`,
//! `README.md` and `LICENSE`, and inlines textual `data:` attachments.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagesmith_generator::{ArtifactGenerator, GenerationRequest, TemplateGenerator};
//!
//! async fn render(request: &GenerationRequest) {
//!     if let Ok(generator) = TemplateGenerator::new(None, "octo") {
//!         if let Ok(files) = generator.generate(request).await {
//!             for (path, content) in files.iter() {
//!                 println!("{path}: {} bytes", content.len());
//!             }
//!         }
//!     }
//! }
//! ```

pub mod attachments;
pub mod context;
pub mod engine;
pub mod error;

use async_trait::async_trait;
use pagesmith_core::{ArtifactSet, Attachment, Task};

pub use context::GenerationContext;
pub use engine::{ArtifactKind, TemplateEngine, TemplateGenerator};
pub use error::GenerateError;

/// What a generator is given: the brief, the ordered checks the result will
/// be judged against, and the attachments it may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub task: String,
    pub round: u32,
    pub brief: String,
    pub checks: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl GenerationRequest {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task: task.id.0.clone(),
            round: task.round,
            brief: task.brief.clone(),
            checks: task.checks.clone(),
            attachments: task.attachments.clone(),
        }
    }
}

/// Produces the file set for one task.
///
/// Implementations must return a set containing
/// [`ENTRY_POINT`](pagesmith_core::ENTRY_POINT), a README and a license.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<ArtifactSet, GenerateError>;
}
