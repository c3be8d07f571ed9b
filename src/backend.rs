//! Backend build driver.
//!
//! Every `.js` file under the backend source directory is processed in two
//! structural passes (inline imports, strip export keywords) and then
//! emitted either concatenated into a single script or as separate files
//! mirroring the source layout.
//!
//! Concatenation order is deterministic: files named in `priorityOrder`
//! come first in the order configured, everything else follows sorted by
//! relative path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::config::BuildConfig;
use crate::js::exports::strip_export_keywords;
use crate::js::imports::{Bundler, inline_imports};
use crate::js::minify::minify_or_keep;
use crate::scan::{SourceFile, scan_files};
use crate::{debug, log};
use crate::utils::path::normalize_rel;

/// A backend source file after import inlining and export stripping.
#[derive(Debug)]
pub struct ProcessedFile {
    pub rel: PathBuf,
    pub code: String,
}

/// Build the backend: process every source file and emit per configuration.
pub fn build_backend(config: &BuildConfig, bundler: &dyn Bundler) -> Result<()> {
    let mut files = scan_files(&config.backend.src, "js");
    if files.is_empty() {
        log!("warn"; "No backend sources found in {}", config.backend.src.display());
        return Ok(());
    }
    sort_for_output(&mut files, &config.backend.priority_order);

    let mut processed = Vec::with_capacity(files.len());
    for file in &files {
        debug!("backend"; "Processing {}", file.rel.display());
        processed.push(process_file(file, bundler)?);
    }
    log!("backend"; "Processed {} files", processed.len());

    if config.backend.concatenate {
        emit_concatenated(config, &processed)
    } else {
        emit_separate(config, &processed)
    }
}

/// Run both structural passes over one source file.
fn process_file(file: &SourceFile, bundler: &dyn Bundler) -> Result<ProcessedFile> {
    let source = fs::read_to_string(&file.path)
        .with_context(|| format!("Failed to read {}", file.path.display()))?;
    let dir = file
        .path
        .parent()
        .ok_or_else(|| anyhow!("source '{}' has no parent directory", file.path.display()))?;

    let code = inline_imports(&source, dir, bundler)
        .with_context(|| format!("Failed to inline imports in {}", file.rel.display()))?;
    let code = strip_export_keywords(&code)
        .with_context(|| format!("Failed to strip exports in {}", file.rel.display()))?;

    Ok(ProcessedFile {
        rel: file.rel.clone(),
        code,
    })
}

/// Priority entries first (configured order), everything else after, sorted
/// by relative path. Paths are compared lexically normalized so `./a.js`
/// in the configuration still matches the scanned `a.js`.
fn sort_for_output(files: &mut [SourceFile], priority_order: &[PathBuf]) {
    let normalized: Vec<PathBuf> = priority_order.iter().map(|p| normalize_rel(p)).collect();
    let rank = |file: &SourceFile| {
        let rel = normalize_rel(&file.rel);
        normalized
            .iter()
            .position(|p| *p == rel)
            .unwrap_or(usize::MAX)
    };
    files.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.rel.cmp(&b.rel)));
}

/// Join processed files into a single output script, with a package banner
/// and a path comment above each file's section.
fn emit_concatenated(config: &BuildConfig, processed: &[ProcessedFile]) -> Result<()> {
    let mut output = read_banner(&config.package);
    for file in processed {
        output.push_str(&format!("// --- {} ---\n", file.rel.display()));
        output.push_str(file.code.trim_end());
        output.push_str("\n\n");
    }

    let body = if config.backend.minify {
        // Banner survives: minify only the code, re-prefix the banner
        let banner = read_banner(&config.package);
        let code = &output[banner.len()..];
        format!(
            "{banner}{}",
            minify_or_keep(code, &config.backend.out_file)
        )
    } else {
        output
    };

    let out_path = config.out_dir.join(&config.backend.out_file);
    write_output(&out_path, &body)?;
    log!("backend"; "Wrote {}", out_path.display());
    Ok(())
}

/// Emit each processed file under the output directory, mirroring the
/// source layout.
fn emit_separate(config: &BuildConfig, processed: &[ProcessedFile]) -> Result<()> {
    for file in processed {
        let code = if config.backend.minify {
            minify_or_keep(&file.code, &file.rel.to_string_lossy())
        } else {
            file.code.clone()
        };
        let out_path = config.out_dir.join(&file.rel);
        write_output(&out_path, &code)?;
        log!("backend"; "Wrote {}", out_path.display());
    }
    Ok(())
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[derive(Deserialize)]
struct PackageMeta {
    name: Option<String>,
    version: Option<String>,
}

/// Banner comment from package metadata. Any failure (missing file, bad
/// JSON, missing fields) yields an empty banner; the build never depends
/// on package metadata being present.
fn read_banner(package: &Path) -> String {
    let Ok(content) = fs::read_to_string(package) else {
        return String::new();
    };
    let Ok(meta) = serde_json::from_str::<PackageMeta>(&content) else {
        return String::new();
    };
    match (meta.name, meta.version) {
        (Some(name), Some(version)) => format!("/**\n * {name} v{version}\n */\n"),
        _ => String::new(),
    }
}
