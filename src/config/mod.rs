//! Build configuration management for `build.config.json`.
//!
//! The configuration is loaded once at startup and threaded explicitly
//! through every pipeline stage. The only mutation is recording deployment
//! identifiers discovered at runtime, which is an explicit, separately
//! callable effect (`persist_deployment_id`) rather than a setter side
//! effect: it re-reads the file, updates the one field, and writes the
//! result back before returning.
//!
//! # Fields (camelCase on disk)
//!
//! | Field                | Purpose                                       |
//! |----------------------|-----------------------------------------------|
//! | `outDir`             | build output directory                        |
//! | `manifest`           | static manifest copied into the output        |
//! | `package`            | package metadata used for the banner          |
//! | `frontend.*`         | frontend source dir, build/minify flags       |
//! | `backend.*`          | backend source dir, flags, output, ordering   |
//! | `deployment.*`       | discovered dev/prod deployment identifiers    |

mod error;

pub use error::ConfigError;

use crate::cli::Cli;
use crate::log;
use crate::utils::path::normalize_path;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing build.config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Build output directory
    pub out_dir: PathBuf,

    /// Hosting-platform manifest, copied verbatim into the output
    pub manifest: PathBuf,

    /// Package metadata file (name/version for the output banner)
    pub package: PathBuf,

    /// Frontend build settings
    pub frontend: FrontendConfig,

    /// Backend build settings
    pub backend: BackendConfig,

    /// Discovered deployment identifiers (written back on discovery)
    pub deployment: DeploymentConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            out_dir: PathBuf::from("dist"),
            manifest: PathBuf::from("appsscript.json"),
            package: PathBuf::from("package.json"),
            frontend: FrontendConfig::default(),
            backend: BackendConfig::default(),
            deployment: DeploymentConfig::default(),
        }
    }
}

/// Frontend build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrontendConfig {
    /// Whether to build the frontend at all
    pub build: bool,

    /// Frontend source directory (markup entry files live here)
    pub src: PathBuf,

    /// Post-process emitted HTML through the HTML minifier
    pub minify: bool,

    /// Frontend bundler invocation, one build per entry
    pub command: Vec<String>,

    /// Dev server invocation for `--dev`
    pub dev_command: Vec<String>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            build: true,
            src: PathBuf::from("src/frontend"),
            minify: true,
            command: str_vec(&["npx", "vite", "build"]),
            dev_command: str_vec(&["npx", "vite"]),
        }
    }
}

/// Backend build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackendConfig {
    /// Whether to build the backend at all
    pub build: bool,

    /// Backend source directory (.js files)
    pub src: PathBuf,

    /// Minify processed backend code
    pub minify: bool,

    /// Concatenate all files into `outFile` instead of emitting separately
    pub concatenate: bool,

    /// Output filename for concatenate mode
    pub out_file: String,

    /// Relative paths emitted first, in this order
    pub priority_order: Vec<PathBuf>,

    /// Bundler invocation used to inline imports
    pub bundler: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            build: true,
            src: PathBuf::from("src/backend"),
            minify: true,
            concatenate: true,
            out_file: "Code.js".to_string(),
            priority_order: Vec::new(),
            bundler: str_vec(&["npx", "esbuild"]),
        }
    }
}

/// Deployment identifiers and the deployment CLI invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentConfig {
    /// `@HEAD` (dev) deployment identifier
    pub dev_deployment_id: Option<String>,

    /// Latest versioned (prod) deployment identifier
    pub prod_deployment_id: Option<String>,

    /// Deployment CLI invocation
    pub command: Vec<String>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            dev_deployment_id: None,
            prod_deployment_id: None,
            command: str_vec(&["npx", "clasp"]),
        }
    }
}

/// Which deployment identifier to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentKind {
    Dev,
    Prod,
}

impl DeploymentKind {
    /// JSON field name under the `deployment` object.
    pub const fn field(self) -> &'static str {
        match self {
            Self::Dev => "devDeploymentId",
            Self::Prod => "prodDeploymentId",
        }
    }
}

fn str_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl BuildConfig {
    /// Load configuration from CLI arguments.
    ///
    /// The project root is the config file's parent directory; all
    /// configured paths are normalized against it. `priorityOrder` entries
    /// stay relative because they are matched against scanner output.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = normalize_path(&cli.config);
        if !config_path.is_file() {
            return Err(ConfigError::Validation(format!(
                "config file '{}' not found",
                cli.config.display()
            ))
            .into());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|err| ConfigError::Io(config_path.clone(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            log!("warn"; "unknown fields in {}:", config_path.display());
            for field in &ignored {
                log!("warn"; "- {field}");
            }
        }

        config.config_path = config_path;
        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.finalize(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string (paths left unnormalized).
    pub fn from_str(content: &str) -> Result<Self> {
        let (config, _) = Self::parse_with_ignored(content)?;
        Ok(config)
    }

    /// Parse JSON content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let mut deserializer = serde_json::Deserializer::from_str(content);
        let config = serde_ignored::deserialize(&mut deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Json)?;
        Ok((config, ignored))
    }

    /// Resolve configured paths against the project root.
    fn finalize(&mut self, root: &Path) {
        self.root = normalize_path(root);
        self.out_dir = self.root.join(&self.out_dir);
        self.manifest = self.root.join(&self.manifest);
        self.package = self.root.join(&self.package);
        self.frontend.src = self.root.join(&self.frontend.src);
        self.backend.src = self.root.join(&self.backend.src);
    }

    /// Validate configuration before running the pipeline.
    fn validate(&self) -> Result<()> {
        if self.backend.build && self.backend.concatenate && self.backend.out_file.is_empty() {
            return Err(ConfigError::Validation(
                "backend.outFile must not be empty in concatenate mode".into(),
            )
            .into());
        }
        if self.backend.build && self.backend.bundler.is_empty() {
            return Err(ConfigError::Validation("backend.bundler must not be empty".into()).into());
        }
        if self.frontend.build && self.frontend.command.is_empty() {
            return Err(
                ConfigError::Validation("frontend.command must not be empty".into()).into(),
            );
        }
        Ok(())
    }

    /// Persist a newly discovered deployment identifier.
    ///
    /// Read-modify-write on the config file: re-reads the file, updates the
    /// one `deployment` field, writes the result back (field order
    /// preserved), then updates the in-memory record. Completes before
    /// returning; single process, no concurrent writers.
    pub fn persist_deployment_id(&mut self, kind: DeploymentKind, id: &str) -> Result<()> {
        let content = fs::read_to_string(&self.config_path)
            .map_err(|err| ConfigError::Io(self.config_path.clone(), err))?;
        let mut value: serde_json::Value =
            serde_json::from_str(&content).map_err(ConfigError::Json)?;

        let object = value
            .as_object_mut()
            .ok_or_else(|| ConfigError::Validation("config root must be a JSON object".into()))?;
        let deployment = object
            .entry("deployment")
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        let deployment = deployment.as_object_mut().ok_or_else(|| {
            ConfigError::Validation("config field 'deployment' must be an object".into())
        })?;
        deployment.insert(
            kind.field().to_string(),
            serde_json::Value::String(id.to_string()),
        );

        let mut serialized = serde_json::to_string_pretty(&value).map_err(ConfigError::Json)?;
        serialized.push('\n');
        fs::write(&self.config_path, serialized)
            .map_err(|err| ConfigError::Io(self.config_path.clone(), err))?;

        match kind {
            DeploymentKind::Dev => self.deployment.dev_deployment_id = Some(id.to_string()),
            DeploymentKind::Prod => self.deployment.prod_deployment_id = Some(id.to_string()),
        }
        Ok(())
    }
}

// ============================================================================
// tests
// ============================================================================
