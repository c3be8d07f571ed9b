//! Frontend build driver.
//!
//! Each `index.html` under the frontend source directory is an independent
//! entry: the configured bundler runs once per entry with the entry's own
//! directory as its project root, emitting into a mirrored subdirectory of
//! the output directory. A failed entry build aborts the whole run. After
//! all entries build, an optional minification pass rewrites the emitted
//! HTML in place; a file that cannot be read back is skipped with a warning
//! rather than failing the build.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

use crate::config::BuildConfig;
use crate::log;
use crate::scan::scan_files;
use crate::utils::exec::Cmd;

/// Frontend bundler capability: build one entry file into an output
/// directory. The entry file is the sole input of the build.
pub trait FrontendBuilder {
    fn build(&self, entry: &Path, out_dir: &Path) -> Result<()>;
}

/// Vite CLI adapter: the entry's directory becomes the vite root (vite
/// resolves that directory's `index.html` itself), with an absolute
/// `--outDir` so the shared output directory is never emptied between
/// entries.
///
/// The vite CLI has no per-file input flag, so an entry not named
/// `index.html` cannot be expressed; that is an error, never a silent build
/// of the wrong file.
pub struct ViteCli {
    command: Vec<String>,
}

impl ViteCli {
    pub fn new(command: &[String]) -> Self {
        Self {
            command: command.to_vec(),
        }
    }
}

impl FrontendBuilder for ViteCli {
    fn build(&self, entry: &Path, out_dir: &Path) -> Result<()> {
        let entry_dir = entry
            .parent()
            .ok_or_else(|| anyhow!("entry '{}' has no parent directory", entry.display()))?;
        if entry.file_name().and_then(|n| n.to_str()) != Some("index.html") {
            bail!(
                "vite builds a directory's index.html; entry '{}' cannot be selected \
                 (rename it to index.html in its own subdirectory)",
                entry.display()
            );
        }
        Cmd::from_slice(&self.command)
            .arg("--outDir")
            .arg(out_dir)
            .cwd(entry_dir)
            .run()?;
        Ok(())
    }
}

/// Build every frontend entry, then minify the emitted HTML if configured.
pub fn build_frontend(config: &BuildConfig, builder: &dyn FrontendBuilder) -> Result<()> {
    let entries = scan_files(&config.frontend.src, "html");
    if entries.is_empty() {
        log!("warn"; "No frontend entries found in {}", config.frontend.src.display());
        return Ok(());
    }

    for entry in &entries {
        let rel_dir = entry.rel.parent().unwrap_or_else(|| Path::new(""));
        let out_dir = config.out_dir.join(rel_dir);

        log!("frontend"; "Building entry {}", entry.rel.display());
        builder
            .build(&entry.path, &out_dir)
            .with_context(|| format!("Frontend build failed for entry '{}'", entry.rel.display()))?;
    }

    if config.frontend.minify {
        minify_emitted_html(&config.out_dir);
    }
    Ok(())
}

/// Minify every emitted HTML file in place. Unreadable files are skipped
/// with a warning so one bad file cannot fail an otherwise finished build.
fn minify_emitted_html(out_dir: &Path) {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;

    for file in scan_files(out_dir, "html") {
        let content = match fs::read(&file.path) {
            Ok(content) => content,
            Err(err) => {
                log!("warn"; "Skipping minification of {}: {err}", file.rel.display());
                continue;
            }
        };
        let minified = minify_html::minify(&content, &cfg);
        if let Err(err) = fs::write(&file.path, minified) {
            log!("warn"; "Could not write minified {}: {err}", file.rel.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct FakeBuilder {
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
        fail_on: Option<usize>,
    }

    impl FakeBuilder {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    impl FrontendBuilder for FakeBuilder {
        fn build(&self, entry: &Path, out_dir: &Path) -> Result<()> {
            let mut calls = self.calls.borrow_mut();
            if self.fail_on == Some(calls.len()) {
                bail!("build tool exited with status 1");
            }
            calls.push((entry.to_path_buf(), out_dir.to_path_buf()));
            Ok(())
        }
    }

    fn config_for(dir: &TempDir) -> BuildConfig {
        let path = dir.path().join("build.config.json");
        fs::write(&path, "{}").unwrap();
        let cli = Cli::parse_from(["claspforge", "--config", path.to_str().unwrap()]);
        BuildConfig::load(&cli).unwrap()
    }

    #[test]
    fn test_entries_build_into_mirrored_dirs() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src/frontend");
        fs::create_dir_all(src.join("admin")).unwrap();
        fs::write(src.join("index.html"), "<html></html>").unwrap();
        fs::write(src.join("admin/index.html"), "<html></html>").unwrap();

        let config = config_for(&dir);
        let builder = FakeBuilder::new();
        build_frontend(&config, &builder).unwrap();

        // Entries are scanned in sorted order: admin/index.html first
        let calls = builder.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].0.ends_with("admin/index.html"));
        assert_eq!(calls[0].1, config.out_dir.join("admin"));
        assert!(calls[1].0.ends_with("frontend/index.html"));
        assert_eq!(calls[1].1, config.out_dir.clone());
    }

    #[test]
    fn test_sibling_entries_are_distinct_builds() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src/frontend");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("index.html"), "<html></html>").unwrap();
        fs::write(src.join("admin.html"), "<html></html>").unwrap();

        let config = config_for(&dir);
        let builder = FakeBuilder::new();
        build_frontend(&config, &builder).unwrap();

        // Each entry file is its own build input, never the shared directory
        let calls = builder.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].0.ends_with("admin.html"));
        assert!(calls[1].0.ends_with("index.html"));
        assert_ne!(calls[0].0, calls[1].0);
    }

    #[test]
    fn test_vite_rejects_unselectable_entry() {
        let command = vec!["npx".to_string(), "vite".to_string(), "build".to_string()];
        let vite = ViteCli::new(&command);
        let err = vite
            .build(Path::new("/project/src/frontend/admin.html"), Path::new("/project/dist"))
            .unwrap_err();
        assert!(err.to_string().contains("admin.html"));
    }

    #[test]
    fn test_no_entries_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        let builder = FakeBuilder::new();
        build_frontend(&config, &builder).unwrap();
        assert!(builder.calls.borrow().is_empty());
    }

    #[test]
    fn test_entry_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src/frontend");
        fs::create_dir_all(src.join("b")).unwrap();
        fs::write(src.join("index.html"), "").unwrap();
        fs::write(src.join("b/index.html"), "").unwrap();

        let config = config_for(&dir);
        let builder = FakeBuilder {
            calls: RefCell::new(Vec::new()),
            fail_on: Some(1),
        };
        let err = build_frontend(&config, &builder).unwrap_err();
        assert!(format!("{err:#}").contains("Frontend build failed"));
        // First entry already ran before the failure
        assert_eq!(builder.calls.borrow().len(), 1);
    }

    #[test]
    fn test_minify_pass_rewrites_html() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        fs::create_dir_all(&out).unwrap();
        fs::write(
            out.join("index.html"),
            "<html>\n  <!-- comment -->\n  <body>  <p>hi</p>  </body>\n</html>",
        )
        .unwrap();

        minify_emitted_html(&out);
        let result = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(!result.contains("comment"));
        assert!(result.contains("<p>hi</p>"));
    }
}
