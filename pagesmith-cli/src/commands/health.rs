//! `pagesmith health`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use pagesmith_daemon::HealthResponse;

use super::DEFAULT_SERVER_URL;

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the intake server.
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    pub url: String,
}

impl HealthArgs {
    pub fn run(self) -> Result<()> {
        let base = self.url.trim_end_matches('/');
        let health: HealthResponse = ureq::get(&format!("{base}/"))
            .call()
            .with_context(|| format!("intake server at {base} is not reachable"))?
            .into_json()
            .context("unexpected health response")?;
        println!("{} {} ({})", "●".green(), health.status, health.message);
        Ok(())
    }
}
