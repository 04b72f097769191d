//! Error types for pagesmith-generator.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while generating an artifact set.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// Generated output could not be added to the artifact set.
    #[error("artifact error: {0}")]
    Artifact(#[from] pagesmith_core::ArtifactError),

    /// The finished set lacks a required file.
    #[error("generated output is missing required file `{0}`")]
    MissingFile(&'static str),
}
