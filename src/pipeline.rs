//! Build pipeline orchestration.
//!
//! Stage order is fixed: preflight, clean output, copy manifest, frontend,
//! backend, then the flag-gated push and deploy steps. Each stage is
//! skippable by configuration but never reordered; any stage failure stops
//! the run.

use std::fs;
use std::time::Instant;

use anyhow::{Context, Result, bail};

use crate::backend::build_backend;
use crate::cli::Cli;
use crate::config::BuildConfig;
use crate::deploy::{ClaspCli, DeployTool, create_deployment, push_and_report};
use crate::frontend::{FrontendBuilder, ViteCli, build_frontend};
use crate::js::imports::{Bundler, EsbuildCli};
use crate::log;
use crate::utils::path::clean_dir;

/// Run the full pipeline with CLI adapters for every external tool.
pub fn run(config: &mut BuildConfig, cli: &Cli) -> Result<()> {
    let builder = ViteCli::new(&config.frontend.command);
    let bundler = EsbuildCli::new(&config.backend.bundler);
    let tool = ClaspCli::new(&config.deployment.command, &config.root);
    run_with(config, cli, &builder, &bundler, &tool)
}

fn run_with(
    config: &mut BuildConfig,
    cli: &Cli,
    builder: &dyn FrontendBuilder,
    bundler: &dyn Bundler,
    tool: &dyn DeployTool,
) -> Result<()> {
    preflight(config, cli)?;

    let start = Instant::now();
    clean_dir(&config.out_dir)?;
    copy_manifest(config)?;

    if config.frontend.build {
        build_frontend(config, builder)?;
    } else {
        log!("frontend"; "Skipped (disabled in configuration)");
    }

    if config.backend.build {
        build_backend(config, bundler)?;
    } else {
        log!("backend"; "Skipped (disabled in configuration)");
    }

    log!("build"; "Finished in {}ms", start.elapsed().as_millis());

    if cli.should_push() {
        push_and_report(config, tool)?;
    }
    if cli.deploy {
        create_deployment(config, tool)?;
    }
    Ok(())
}

/// Verify every external tool the run will need before touching the output
/// directory.
fn preflight(config: &BuildConfig, cli: &Cli) -> Result<()> {
    let mut programs = Vec::new();
    if config.frontend.build {
        programs.push(("frontend.command", config.frontend.command.first()));
    }
    if config.backend.build {
        programs.push(("backend.bundler", config.backend.bundler.first()));
    }
    if cli.should_push() {
        programs.push(("deployment.command", config.deployment.command.first()));
    }

    for (field, program) in programs {
        let Some(program) = program else {
            bail!("{field} must not be empty");
        };
        if which::which(program).is_err() {
            bail!("'{program}' (from {field}) not found in PATH");
        }
    }
    Ok(())
}

/// Copy the platform manifest into the output directory. The destination is
/// always `appsscript.json` regardless of the source filename, because the
/// hosting platform only recognizes that name. A missing manifest is a
/// warning: local-only builds work without one.
fn copy_manifest(config: &BuildConfig) -> Result<()> {
    if !config.manifest.is_file() {
        log!("warn"; "Manifest {} not found, skipping", config.manifest.display());
        return Ok(());
    }
    let dest = config.out_dir.join("appsscript.json");
    fs::copy(&config.manifest, &dest)
        .with_context(|| format!("Failed to copy manifest to {}", dest.display()))?;
    Ok(())
}
