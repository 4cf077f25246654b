//! CLI definitions for buildwire.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "buildwire",
    version,
    about = "Replay a build script through the remote event reporter",
    after_help = "Examples:\n  buildwire run build.toml --port 4100\n  buildwire run build.toml compile dist -D out.dir=build --port 4100\n  buildwire run build.toml --projecthelp --port 4100\n  buildwire run build.toml --debug --port 4100 --debug-port 4101\n  buildwire check build.toml --config buildwire.toml"
)]
pub struct Cli {
    /// Show debug-level diagnostics on stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a build script, reporting its events to a listener.
    Run(RunArgs),
    /// Validate a build script and configuration without connecting.
    Check {
        /// Build script (TOML).
        script: PathBuf,
        #[command(flatten)]
        options: ReportOptions,
    },
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Build script (TOML).
    pub script: PathBuf,
    /// Targets to run, in order. Defaults to the script's default target.
    pub targets: Vec<String>,
    #[command(flatten)]
    pub options: ReportOptions,
    /// User property applied once the build starts (repeatable).
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub defines: Vec<String>,
    /// List the script's targets instead of running them.
    #[arg(short = 'p', long = "projecthelp", conflicts_with = "debug")]
    pub project_help: bool,
    /// Accept a debug control connection and allow suspends.
    #[arg(long)]
    pub debug: bool,
    /// Control channel port (sets `buildwire.debug.port`).
    #[arg(long, requires = "debug")]
    pub debug_port: Option<u16>,
}

#[derive(Debug, clap::Args)]
pub struct ReportOptions {
    /// Reporter configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Message output threshold (error, warn, info, verbose, debug).
    #[arg(long)]
    pub level: Option<String>,
    /// Send task output as plain messages.
    #[arg(long)]
    pub emacs: bool,
    /// Event channel port (sets `buildwire.connect.port`).
    #[arg(long)]
    pub port: Option<u16>,
}
