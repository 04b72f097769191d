//! `pagesmith generate`: render a task's artifact set locally.
//!
//! Files written with `--out` go through a `.pagesmith.tmp` sibling and a
//! rename, so an interrupted run never leaves half-written output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tabled::{settings::Style, Table, Tabled};

use pagesmith_core::ArtifactSet;
use pagesmith_generator::{GenerationRequest, TemplateGenerator};

use super::{load_settings, read_task_file};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Task description (JSON, intake request shape).
    pub task: PathBuf,

    /// Write the files into this directory.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Settings file (template directory, license holder).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize, Tabled)]
struct FileRow {
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "bytes")]
    bytes: usize,
    #[tabled(rename = "sha256")]
    sha256: String,
}

impl GenerateArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings(self.config.as_deref())?;
        let task = read_task_file(&self.task)?.into_task();

        let holder = settings
            .generator
            .license_holder
            .clone()
            .filter(|h| !h.is_empty())
            .or_else(|| Some(settings.github.owner.clone()).filter(|o| !o.is_empty()))
            .unwrap_or_else(|| task.email.clone());
        let generator = TemplateGenerator::new(settings.generator.template_dir.as_deref(), holder)
            .context("failed to load templates")?;
        let files = generator
            .render(&GenerationRequest::from_task(&task))
            .context("generation failed")?;

        if let Some(out) = self.out.as_deref() {
            write_all(out, &files)?;
        }

        let rows = rows(&files);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize file list")?
            );
        } else {
            println!("{} → {} files", task.repo_name(), rows.len());
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
            if let Some(out) = self.out {
                println!("written to {}", out.display());
            }
        }
        Ok(())
    }
}

fn rows(files: &ArtifactSet) -> Vec<FileRow> {
    files
        .iter()
        .map(|(path, content)| {
            let digest = hex::encode(Sha256::digest(content.as_bytes()));
            FileRow {
                path: path.to_string(),
                bytes: content.len(),
                sha256: digest[..12].to_string(),
            }
        })
        .collect()
}

fn write_all(out: &Path, files: &ArtifactSet) -> Result<()> {
    for (rel, content) in files.iter() {
        let path = out.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = PathBuf::from(format!("{}.pagesmith.tmp", path.display()));
        std::fs::write(&tmp, content)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("failed to write {}", path.display()));
        }
    }
    Ok(())
}
