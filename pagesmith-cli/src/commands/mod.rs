pub mod config;
pub mod generate;
pub mod health;
pub mod run;
pub mod serve;
pub mod submit;

use std::path::Path;

use anyhow::{Context, Result};

use pagesmith_core::Settings;
use pagesmith_daemon::DeployRequest;

/// Default address of a locally running intake server.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Read a task file in the intake request shape. `secret` may be absent.
pub fn read_task_file(path: &Path) -> Result<DeployRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read task file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid task description", path.display()))
}

/// Layered settings load: file, then `PAGESMITH_*` environment.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    Settings::load(explicit).context("failed to load settings")
}
