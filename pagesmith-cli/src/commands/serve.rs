//! `pagesmith serve`: the intake server in the foreground.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pagesmith_daemon::start_blocking;

use super::load_settings;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Settings file to use instead of ~/.pagesmith/config.yaml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings(self.config.as_deref())?;
        start_blocking(settings, self.log_json).context("intake server exited with error")
    }
}
