//! CLI entrypoint for buildwire.

#[path = "buildwire/cli.rs"]
mod cli;
#[path = "buildwire/run.rs"]
mod run;

use clap::Parser;
use tracing::Level;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Run(args) => run::run_script(&args),
        Command::Check { script, options } => run::check_script(&script, &options),
    };
    if let Err(err) = result {
        eprintln!("buildwire error: {err:#}");
        std::process::exit(1);
    }
}
