//! Deployment driver.
//!
//! Wraps the platform deployment CLI: push the built output, then report a
//! browsable URL. Deployment identifiers are scraped from the CLI's human
//! readable output (there is no machine-readable mode), so both scrapers
//! strip ANSI escapes first and tolerate missing matches.
//!
//! Discovered identifiers are written back into the configuration file so
//! subsequent runs skip the lookup.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::{BuildConfig, DeploymentKind};
use crate::log;
use crate::logger;
use crate::utils::exec::{Cmd, strip_ansi};

/// Deployment CLI capability, one method per subcommand used.
pub trait DeployTool {
    /// Push the built project, overwriting the remote copy.
    fn push(&self) -> Result<String>;
    /// List existing deployments.
    fn deployments(&self) -> Result<String>;
    /// Create a new versioned deployment.
    fn deploy(&self) -> Result<String>;
}

/// clasp CLI adapter, invoked from the project root where the tool's own
/// project file lives.
pub struct ClaspCli {
    command: Vec<String>,
    root: PathBuf,
}

impl ClaspCli {
    pub fn new(command: &[String], root: &std::path::Path) -> Self {
        Self {
            command: command.to_vec(),
            root: root.to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Cmd::from_slice(&self.command)
            .args(args.iter().copied())
            .cwd(&self.root)
            .run()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DeployTool for ClaspCli {
    fn push(&self) -> Result<String> {
        self.run(&["push", "--force"])
    }

    fn deployments(&self) -> Result<String> {
        self.run(&["deployments"])
    }

    fn deploy(&self) -> Result<String> {
        self.run(&["deploy"])
    }
}

// ============================================================================
// Output scraping
// ============================================================================

/// Extract the `@HEAD` deployment identifier from a deployments listing.
pub fn parse_head_deployment(output: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"- ([A-Za-z0-9_-]+)\s+@HEAD").unwrap());
    let clean = strip_ansi(output);
    re.captures(&clean).map(|c| c[1].to_string())
}

/// Extract the identifier of a freshly created versioned deployment.
pub fn parse_new_deployment(output: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"Deployed\s+([A-Za-z0-9_-]+)\s+@\d+").unwrap());
    let clean = strip_ansi(output);
    re.captures(&clean).map(|c| c[1].to_string())
}

fn dev_url(id: &str) -> String {
    format!("https://script.google.com/macros/s/{id}/dev")
}

fn exec_url(id: &str) -> String {
    format!("https://script.google.com/macros/s/{id}/exec")
}

// ============================================================================
// Operations
// ============================================================================

/// Push the built output and print the dev URL of the `@HEAD` deployment.
///
/// The `@HEAD` identifier is stable for the project's lifetime, so a cached
/// identifier skips the listing. A fresh lookup retries once: the listing
/// occasionally lags right after a push. An unrecognized listing after the
/// retry is a warning, not an error: the push itself already succeeded.
pub fn push_and_report(config: &mut BuildConfig, tool: &dyn DeployTool) -> Result<()> {
    log!("push"; "Pushing project");
    tool.push().context("Push failed")?;

    let id = match &config.deployment.dev_deployment_id {
        Some(id) => Some(id.clone()),
        None => {
            let id = fetch_head_id(tool)?;
            if let Some(id) = &id {
                config.persist_deployment_id(DeploymentKind::Dev, id)?;
            }
            id
        }
    };
    match id {
        Some(id) => logger::link("dev", &dev_url(&id)),
        None => {
            log!("warn"; "Push succeeded but no @HEAD deployment was recognized in the listing");
        }
    }
    Ok(())
}

/// Listing subprocess failures are fatal; an output that merely doesn't
/// match is `None`.
fn fetch_head_id(tool: &dyn DeployTool) -> Result<Option<String>> {
    for _ in 0..2 {
        let output = tool.deployments().context("Could not list deployments")?;
        if let Some(id) = parse_head_deployment(&output) {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// Create a new versioned deployment and print its exec URL.
///
/// A listing format change must not fail an otherwise successful deploy,
/// so an unrecognized output is a warning, not an error.
pub fn create_deployment(config: &mut BuildConfig, tool: &dyn DeployTool) -> Result<()> {
    log!("deploy"; "Creating versioned deployment");
    let output = tool.deploy().context("Deploy failed")?;

    match parse_new_deployment(&output) {
        Some(id) => {
            config.persist_deployment_id(DeploymentKind::Prod, &id)?;
            logger::link("prod", &exec_url(&id));
        }
        None => {
            log!("warn"; "Deployment succeeded but no deployment id was recognized in the output");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    struct FakeTool {
        deployments_outputs: RefCell<Vec<String>>,
        deploy_output: String,
        pushed: RefCell<bool>,
    }

    impl FakeTool {
        fn new(deployments: &[&str], deploy: &str) -> Self {
            // Outputs popped front-to-back across retries
            let mut outputs: Vec<String> = deployments.iter().map(|s| s.to_string()).collect();
            outputs.reverse();
            Self {
                deployments_outputs: RefCell::new(outputs),
                deploy_output: deploy.to_string(),
                pushed: RefCell::new(false),
            }
        }
    }

    impl DeployTool for FakeTool {
        fn push(&self) -> Result<String> {
            *self.pushed.borrow_mut() = true;
            Ok(String::new())
        }

        fn deployments(&self) -> Result<String> {
            Ok(self.deployments_outputs.borrow_mut().pop().unwrap_or_default())
        }

        fn deploy(&self) -> Result<String> {
            Ok(self.deploy_output.clone())
        }
    }

    fn config_in(dir: &TempDir, content: &str) -> BuildConfig {
        let path = dir.path().join("build.config.json");
        fs::write(&path, content).unwrap();
        let mut config = BuildConfig::from_str(content).unwrap();
        config.config_path = path;
        config
    }

    #[test]
    fn test_parse_head_deployment() {
        let output = "2 Deployments.\n- AKfycbxHEAD123 @HEAD\n- AKfycbxPROD456 @1 - web app\n";
        assert_eq!(
            parse_head_deployment(output).as_deref(),
            Some("AKfycbxHEAD123")
        );
    }

    #[test]
    fn test_parse_head_deployment_strips_ansi() {
        let output = "\x1b[32m- AKfycbxABC @HEAD\x1b[0m\n";
        assert_eq!(parse_head_deployment(output).as_deref(), Some("AKfycbxABC"));
    }

    #[test]
    fn test_parse_head_deployment_none() {
        assert!(parse_head_deployment("No deployments.\n").is_none());
    }

    #[test]
    fn test_scrape_patterns_build_and_miss_cleanly() {
        // Both patterns must construct under the crate's regex feature set
        // and report a plain miss on unmatched input
        assert!(parse_head_deployment("").is_none());
        assert!(parse_new_deployment("").is_none());
    }

    #[test]
    fn test_parse_new_deployment() {
        let output = "Created version 4.\nDeployed AKfycbxNEW789 @4.\n";
        assert_eq!(parse_new_deployment(output).as_deref(), Some("AKfycbxNEW789"));
    }

    #[test]
    fn test_push_caches_head_id() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(
            &dir,
            r#"{"deployment": {"devDeploymentId": "AKfyCACHED"}}"#,
        );
        // Listing would fail the test if consulted: no outputs queued
        let tool = FakeTool::new(&[], "");
        push_and_report(&mut config, &tool).unwrap();
        assert!(*tool.pushed.borrow());
        assert_eq!(config.deployment.dev_deployment_id.as_deref(), Some("AKfyCACHED"));
    }

    #[test]
    fn test_push_fetches_and_persists_head_id() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, "{}");
        let tool = FakeTool::new(&["- AKfyFETCHED @HEAD\n"], "");
        push_and_report(&mut config, &tool).unwrap();

        assert_eq!(config.deployment.dev_deployment_id.as_deref(), Some("AKfyFETCHED"));
        let written = fs::read_to_string(&config.config_path).unwrap();
        assert!(written.contains("AKfyFETCHED"));
    }

    #[test]
    fn test_push_retries_listing_once() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, "{}");
        let tool = FakeTool::new(&["still syncing\n", "- AKfyLATE @HEAD\n"], "");
        push_and_report(&mut config, &tool).unwrap();
        assert_eq!(config.deployment.dev_deployment_id.as_deref(), Some("AKfyLATE"));
    }

    #[test]
    fn test_push_missing_head_id_is_soft() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, "{}");
        let tool = FakeTool::new(&["nothing\n", "nothing\n"], "");
        // A push that worked must not fail the run over an unreadable listing
        push_and_report(&mut config, &tool).unwrap();
        assert!(*tool.pushed.borrow());
        assert!(config.deployment.dev_deployment_id.is_none());
        // Nothing was persisted either
        let written = fs::read_to_string(&config.config_path).unwrap();
        assert!(!written.contains("devDeploymentId"));
    }

    #[test]
    fn test_deploy_persists_prod_id() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, "{}");
        let tool = FakeTool::new(&[], "Deployed AKfyPROD @7.\n");
        create_deployment(&mut config, &tool).unwrap();

        assert_eq!(config.deployment.prod_deployment_id.as_deref(), Some("AKfyPROD"));
        let written = fs::read_to_string(&config.config_path).unwrap();
        assert!(written.contains("AKfyPROD"));
    }

    #[test]
    fn test_deploy_unrecognized_output_is_soft() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, "{}");
        let tool = FakeTool::new(&[], "some new output format\n");
        create_deployment(&mut config, &tool).unwrap();
        assert!(config.deployment.prod_deployment_id.is_none());
    }
}
