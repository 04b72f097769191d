//! `pagesmith submit`: POST a task file to a running intake server.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use pagesmith_daemon::{AcceptedResponse, ErrorResponse};

use super::{load_settings, read_task_file, DEFAULT_SERVER_URL};

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Task description (JSON, intake request shape).
    pub task: PathBuf,

    /// Base URL of the intake server.
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    pub url: String,

    /// Shared secret; defaults to the task file's, then the settings'.
    #[arg(long)]
    pub secret: Option<String>,

    /// Settings file to read the secret from.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl SubmitArgs {
    pub fn run(self) -> Result<()> {
        let mut request = read_task_file(&self.task)?;
        if let Some(secret) = self.secret {
            request.secret = secret;
        } else if request.secret.is_empty() {
            request.secret = load_settings(self.config.as_deref())?.secret;
        }

        let base = self.url.trim_end_matches('/');
        let url = format!("{base}/deploy");
        match ureq::post(&url).send_json(&request) {
            Ok(resp) => {
                let accepted: AcceptedResponse =
                    resp.into_json().context("unexpected response from intake server")?;
                println!("{} {}", "✓".green(), accepted.message);
                Ok(())
            }
            Err(ureq::Error::Status(code, resp)) => {
                let reason = resp
                    .into_json::<ErrorResponse>()
                    .map(|e| e.error)
                    .unwrap_or_else(|_| "no error detail".to_string());
                bail!("intake server rejected the task ({code}): {reason}")
            }
            Err(err) => Err(err).with_context(|| format!("could not reach {url}")),
        }
    }
}
