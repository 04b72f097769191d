//! Pagesmith: turn a task brief into a published static site and report back.
//!
//! # Usage
//!
//! ```text
//! pagesmith serve [--config PATH] [--log-json]
//! pagesmith run <TASK.json> [--dry-run] [--json] [--config PATH]
//! pagesmith generate <TASK.json> [--out DIR] [--json] [--config PATH]
//! pagesmith submit <TASK.json> [--url URL] [--secret S] [--config PATH]
//! pagesmith health [--url URL]
//! pagesmith config init [--force]
//! pagesmith config show [--config PATH]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, generate::GenerateArgs, health::HealthArgs, run::RunArgs,
    serve::ServeArgs, submit::SubmitArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pagesmith",
    version,
    about = "Generate, publish and report static sites for deployment tasks",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the intake HTTP server.
    Serve(ServeArgs),

    /// Run one task through the whole pipeline in the foreground.
    Run(RunArgs),

    /// Render a task's files without publishing anything.
    Generate(GenerateArgs),

    /// Send a task to a running intake server.
    Submit(SubmitArgs),

    /// Check that an intake server is up.
    Health(HealthArgs),

    /// Create or inspect the settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::Run(args) => args.run(),
        Commands::Generate(args) => args.run(),
        Commands::Submit(args) => args.run(),
        Commands::Health(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}
