use crate::normalize::remove_trailing_slashes;
use anyhow::{bail, Context, Result};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Outcome of a batch rewrite
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FixReport {
    pub scanned: usize,
    pub rewritten: Vec<PathBuf>,
}

/// Every `*.html` file under `dir`, sorted
pub fn html_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let is_html = entry.path().extension().map_or(false, |ext| ext == "html");
        if entry.file_type().is_file() && is_html {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Normalize one file in place. Returns whether it was rewritten.
pub fn fix_file(path: &Path) -> Result<bool> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    match remove_trailing_slashes(&content) {
        Cow::Owned(fixed) if fixed != content => {
            fs::write(path, fixed).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Processed");
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Normalize every HTML file of a built site
pub fn fix_directory(dir: &Path) -> Result<FixReport> {
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }

    let files = html_files(dir)?;
    info!(count = files.len(), "Found HTML files to process");

    let mut report = FixReport {
        scanned: files.len(),
        rewritten: Vec::new(),
    };
    for file in files {
        if fix_file(&file)? {
            report.rewritten.push(file);
        }
    }

    info!(
        scanned = report.scanned,
        rewritten = report.rewritten.len(),
        "Done"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("help/mas");
        fs::create_dir_all(&nested).unwrap();

        let dirty = nested.join("index.html");
        let clean = dir.path().join("clean.html");
        let other = dir.path().join("feed.xml");
        fs::write(&dirty, r#"<head><meta charset="utf-8" /></head><p>a<br/>b</p>"#).unwrap();
        fs::write(&clean, "<p>nothing to do</p><br>").unwrap();
        fs::write(&other, "<link/>").unwrap();

        let report = fix_directory(dir.path()).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.rewritten, vec![dirty.clone()]);

        assert_eq!(
            fs::read_to_string(&dirty).unwrap(),
            r#"<head><meta charset="utf-8"></head><p>a<br>b</p>"#
        );
        assert_eq!(fs::read_to_string(&clean).unwrap(), "<p>nothing to do</p><br>");
        assert_eq!(fs::read_to_string(&other).unwrap(), "<link/>");
    }

    #[test]
    fn test_second_pass_rewrites_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.html"), "<img src=\"x\"/>").unwrap();

        assert_eq!(fix_directory(dir.path()).unwrap().rewritten.len(), 1);
        assert!(fix_directory(dir.path()).unwrap().rewritten.is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(fix_directory(&dir.path().join("_site")).is_err());
    }
}
