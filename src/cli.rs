//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::path::PathBuf;

/// claspforge Apps Script build pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Start the frontend dev server instead of building (ignores all other flags)
    #[arg(long)]
    pub dev: bool,

    /// Push built output to the hosting platform after the build
    #[arg(long)]
    pub push: bool,

    /// Create a new deployment after pushing (implies --push)
    #[arg(long)]
    pub deploy: bool,

    /// Config file path
    #[arg(short = 'C', long, default_value = "build.config.json", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Whether built output should be pushed (--deploy implies --push).
    pub const fn should_push(&self) -> bool {
        self.push || self.deploy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_implies_push() {
        let cli = Cli::parse_from(["claspforge", "--deploy"]);
        assert!(cli.should_push());
        assert!(cli.deploy);
        assert!(!cli.push);
    }

    #[test]
    fn test_push_only() {
        let cli = Cli::parse_from(["claspforge", "--push"]);
        assert!(cli.should_push());
        assert!(!cli.deploy);
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["claspforge"]);
        assert_eq!(cli.config, PathBuf::from("build.config.json"));
        assert!(!cli.should_push());
    }
}
