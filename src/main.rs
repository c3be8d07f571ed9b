//! claspforge - build and deploy pipeline for Google Apps Script web apps.

mod backend;
mod cli;
mod config;
mod deploy;
mod dev;
mod frontend;
mod js;
mod logger;
mod pipeline;
mod scan;
mod todo;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::BuildConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    logger::set_verbose(cli.verbose);

    let mut config = BuildConfig::load(&cli)?;

    // Dev mode is terminal: hands off to the dev server, all other flags ignored
    if cli.dev {
        return dev::start_dev_server(&config);
    }

    pipeline::run(&mut config, &cli)
}
