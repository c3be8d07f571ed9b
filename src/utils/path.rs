//! Path normalization utilities.
//!
//! Provides consistent path handling across the pipeline:
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `normalize_rel` - lexical normalization for relative-path comparison
//! - `clean_dir` - recreate a directory from scratch

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Lexically normalize a relative path for comparison.
///
/// Scanner-produced relative paths and configured priority entries must
/// compare equal even when one is written as `./utils/helpers.js`.
/// Drops `.` components and resolves `..` where possible, without
/// touching the filesystem.
pub fn normalize_rel(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Remove a directory (if present) and recreate it empty.
pub fn clean_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to remove output directory {}", dir.display()))?;
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_absolute() {
        let path = Path::new("/absolute/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_relative() {
        let path = Path::new("relative/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_rel_drops_curdir() {
        assert_eq!(
            normalize_rel(Path::new("./utils/helpers.js")),
            PathBuf::from("utils/helpers.js")
        );
        assert_eq!(normalize_rel(Path::new("a.js")), PathBuf::from("a.js"));
    }

    #[test]
    fn test_normalize_rel_resolves_parent() {
        assert_eq!(
            normalize_rel(Path::new("a/../b.js")),
            PathBuf::from("b.js")
        );
    }

    #[test]
    fn test_clean_dir_recreates() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("dist");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.js"), "x").unwrap();

        clean_dir(&out).unwrap();
        assert!(out.exists());
        assert!(!out.join("stale.js").exists());
    }

    #[test]
    fn test_clean_dir_creates_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("never/existed");
        clean_dir(&out).unwrap();
        assert!(out.exists());
    }
}
