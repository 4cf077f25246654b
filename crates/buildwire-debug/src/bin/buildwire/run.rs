//! Command implementations.

use std::path::Path;

use anyhow::Context;
use buildwire_debug::{parse_define, BuildDriver, BuildScript, DebugBuildReporter, DebugConfig};
use buildwire_report::{Priority, RemoteBuildReporter};
use smol_str::SmolStr;
use tracing::{info, warn};

use crate::cli::{ReportOptions, RunArgs};

pub fn run_script(args: &RunArgs) -> anyhow::Result<()> {
    let (config, mut script) = load(&args.script, &args.options)?;
    if let Some(port) = args.debug_port {
        script
            .properties
            .insert(config.port_property.clone(), SmolStr::new(port.to_string()));
    }
    let mut driver = BuildDriver::new(script)
        .with_targets(&args.targets)?
        .with_output_level(config.report.message_output_level);
    for define in &args.defines {
        match parse_define(define) {
            Some((name, value)) => driver = driver.define(name, value),
            None => warn!(%define, "ignoring property without a value"),
        }
    }

    if args.project_help {
        let mut reporter = RemoteBuildReporter::new(config.report);
        driver.project_help(&mut reporter);
        reporter.close();
        return Ok(());
    }
    let outcome = if args.debug {
        let mut reporter = DebugBuildReporter::new(config);
        driver.run(&mut reporter, DebugBuildReporter::is_terminated)
    } else {
        let mut reporter = RemoteBuildReporter::new(config.report);
        driver.run(&mut reporter, |_| false)
    };
    info!(
        build = %outcome.project.name(),
        tasks = outcome.tasks_run,
        halted = outcome.halted,
        "build replay finished"
    );
    Ok(())
}

pub fn check_script(script: &Path, options: &ReportOptions) -> anyhow::Result<()> {
    let (config, script) = load(script, options)?;
    println!(
        "{}: {} target(s), {} task(s), output level {:?}",
        script.name,
        script.targets.len(),
        script.task_count(),
        config.report.message_output_level
    );
    Ok(())
}

fn load(path: &Path, options: &ReportOptions) -> anyhow::Result<(DebugConfig, BuildScript)> {
    let mut config = match &options.config {
        Some(config) => DebugConfig::load(config)
            .with_context(|| format!("load config {}", config.display()))?,
        None => DebugConfig::default(),
    };
    if let Some(level) = &options.level {
        config.report.message_output_level = Priority::parse(level)?;
    }
    if options.emacs {
        config.report.emacs_mode = true;
    }
    let mut script =
        BuildScript::load(path).with_context(|| format!("load script {}", path.display()))?;
    if let Some(port) = options.port {
        script.properties.insert(
            config.report.port_property.clone(),
            SmolStr::new(port.to_string()),
        );
    } else if !script.properties.contains_key(&config.report.port_property) {
        info!("no event port configured; reporting disabled");
    }
    Ok((config, script))
}
