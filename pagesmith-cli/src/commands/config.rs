//! `pagesmith config init|show`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use pagesmith_core::settings::{save, settings_path};
use pagesmith_core::Settings;

use super::load_settings;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a settings file with default values to ~/.pagesmith/config.yaml.
    Init(InitArgs),
    /// Print the effective settings with secrets masked.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Replace an existing settings file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Settings file to use instead of ~/.pagesmith/config.yaml.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init(args) => {
            let path = settings_path().context("could not determine home directory")?;
            if path.exists() && !args.force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            let path = save(&Settings::default()).context("failed to write settings")?;
            println!("wrote {}", path.display());
            println!("set `secret`, `github.token` and `github.owner` before `pagesmith serve`");
        }
        ConfigCommand::Show(args) => {
            let settings = load_settings(args.config.as_deref())?;
            let yaml = serde_yaml::to_string(&settings.redacted())
                .context("failed to render settings")?;
            print!("{yaml}");
        }
    }
    Ok(())
}
