//! `pagesmith run`: one pipeline in the foreground.
//!
//! With `--dry-run` nothing leaves the machine: hosting is the in-memory
//! store, the readiness wait is skipped, and the completion payload is
//! printed instead of POSTed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Args;
use colored::Colorize;

use pagesmith_core::{NotificationPayload, RunMode, Settings};
use pagesmith_daemon::{build_pipeline, init_tracing};
use pagesmith_generator::TemplateGenerator;
use pagesmith_pipeline::{
    ActivationOutcome, CallbackTransport, DeliveryOutcome, InMemoryHosting, Pipeline,
    PipelineConfig, PipelineReport, TransportError,
};

use super::{load_settings, read_task_file};

/// Owner used for dry runs when none is configured.
const DRY_RUN_OWNER: &str = "pagesmith-dry-run";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task description (JSON, intake request shape).
    pub task: PathBuf,

    /// Publish to an in-memory store and print the payload instead of sending it.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Settings file to use instead of ~/.pagesmith/config.yaml.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Prints the payload and reports it as delivered.
struct PrintTransport;

#[async_trait]
impl CallbackTransport for PrintTransport {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, TransportError> {
        let body = serde_json::to_string_pretty(payload).map_err(|e| TransportError(e.to_string()))?;
        println!("[dry-run] would POST to {url}:\n{body}");
        Ok(200)
    }
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        init_tracing(false);
        let settings = load_settings(self.config.as_deref())?;
        let mode = if self.dry_run { RunMode::DryRun } else { RunMode::Run };
        settings.validate(mode).context("settings are incomplete")?;

        let task = read_task_file(&self.task)?.into_task();
        let pipeline = if self.dry_run {
            dry_run_pipeline(&settings)?
        } else {
            build_pipeline(&settings).context("failed to set up pipeline")?
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let report = runtime.block_on(pipeline.run(&task));

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
        } else {
            print_report(&report, self.dry_run);
        }

        if let Some(failure) = &report.failure {
            bail!("pipeline failed while {}: {}", failure.stage, failure.message);
        }
        Ok(())
    }
}

fn dry_run_pipeline(settings: &Settings) -> Result<Pipeline> {
    let owner = if settings.github.owner.is_empty() {
        DRY_RUN_OWNER.to_string()
    } else {
        settings.github.owner.clone()
    };
    let holder = settings
        .generator
        .license_holder
        .clone()
        .unwrap_or_else(|| owner.clone());
    let generator = TemplateGenerator::new(settings.generator.template_dir.as_deref(), holder)
        .context("failed to load templates")?;

    let mut config = PipelineConfig::from_settings(settings);
    config.readiness_delay = Duration::ZERO;
    config.settle_delay = Duration::ZERO;

    Ok(Pipeline::new(
        Arc::new(generator),
        Arc::new(InMemoryHosting::new(owner)),
        Arc::new(PrintTransport),
        config,
    ))
}

fn print_report(report: &PipelineReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let stages: Vec<String> = report.visited.iter().map(|s| s.to_string()).collect();
    println!("{prefix}{} round {}: {}", report.task, report.round, stages.join(" → "));

    if !report.files.is_empty() {
        println!("  files:      {}", report.files.join(", "));
    }
    if let Some(repo) = &report.repository {
        println!("  repository: {}", repo.url);
        println!("  pages:      {}", repo.pages_url());
    }
    if let Some(commit) = &report.commit {
        println!("  commit:     {commit}");
    }
    match &report.activation {
        Some(ActivationOutcome::Enabled) => println!("  activation: {}", "enabled".green()),
        Some(ActivationOutcome::AlreadyEnabled) => {
            println!("  activation: {}", "already enabled".green())
        }
        Some(ActivationOutcome::Failed { reason }) => {
            println!("  activation: {} ({reason})", "failed".yellow())
        }
        None => {}
    }
    match &report.delivery {
        Some(DeliveryOutcome::Delivered { attempts }) => {
            println!("  callback:   {} after {attempts} attempt(s)", "delivered".green())
        }
        Some(DeliveryOutcome::Failed { attempts, reason }) => {
            println!("  callback:   {} after {attempts} attempts ({reason})", "failed".red())
        }
        None => {}
    }
    if let Some(failure) = &report.failure {
        println!("  {} {}: {}", "✗".red(), failure.stage, failure.message);
    } else {
        println!("  {} done", "✓".green());
    }
}
