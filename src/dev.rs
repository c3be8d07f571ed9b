//! Frontend dev server.
//!
//! Runs the configured dev command in the frontend source directory with
//! inherited stdio, blocking until the server exits. No build pipeline
//! stages run in this mode.

use anyhow::{Context, Result};

use crate::config::BuildConfig;
use crate::log;
use crate::utils::exec::Cmd;

pub fn start_dev_server(config: &BuildConfig) -> Result<()> {
    if config.frontend.dev_command.is_empty() {
        anyhow::bail!("frontend.devCommand must not be empty");
    }
    log!("dev"; "Starting dev server in {}", config.frontend.src.display());

    Cmd::from_slice(&config.frontend.dev_command)
        .cwd(&config.frontend.src)
        .run_interactive()
        .context("Dev server exited with an error")
}
