//! Source file scanning (pure, no side effects).

use std::path::{Path, PathBuf};

/// A discovered source file: absolute path plus path relative to the scan
/// root. Never mutated after scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the scan root (e.g. `sub/index.html`)
    pub rel: PathBuf,
}

/// Recursively enumerate files with the given extension under `root`.
///
/// Results are sorted by relative path for deterministic builds. A missing
/// root directory yields an empty list.
///
/// # Pure Function
///
/// This function only reads the filesystem and returns data.
pub fn scan_files(root: &Path, ext: &str) -> Vec<SourceFile> {
    let mut results = Vec::new();
    if !root.exists() {
        return results;
    }

    scan_recursive(&mut results, root, root, ext);
    results.sort_by(|a, b| a.rel.cmp(&b.rel));
    results
}

/// Recursive helper for scanning source files.
fn scan_recursive(results: &mut Vec<SourceFile>, dir: &Path, root: &Path, ext: &str) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_recursive(results, &path, root, ext);
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            results.push(SourceFile { path, rel });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_missing_root() {
        let dir = TempDir::new().unwrap();
        let files = scan_files(&dir.path().join("nonexistent"), "js");
        assert!(files.is_empty());
    }

    #[test]
    fn test_scan_flat() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.js"), "function doGet() {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let files = scan_files(dir.path(), "js");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel, PathBuf::from("main.js"));
        assert!(files[0].path.is_absolute());
    }

    #[test]
    fn test_scan_nested_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("utils");
        fs::create_dir_all(&sub).unwrap();
        fs::write(dir.path().join("zeta.js"), "").unwrap();
        fs::write(dir.path().join("alpha.js"), "").unwrap();
        fs::write(sub.join("helpers.js"), "").unwrap();

        let files = scan_files(dir.path(), "js");
        let rels: Vec<_> = files.iter().map(|f| f.rel.clone()).collect();
        assert_eq!(
            rels,
            vec![
                PathBuf::from("alpha.js"),
                PathBuf::from("utils/helpers.js"),
                PathBuf::from("zeta.js"),
            ]
        );
    }

    #[test]
    fn test_scan_html_entries() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(sub.join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("app.js"), "").unwrap();

        let files = scan_files(dir.path(), "html");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].rel, PathBuf::from("index.html"));
        assert_eq!(files[1].rel, PathBuf::from("sub/index.html"));
    }
}
