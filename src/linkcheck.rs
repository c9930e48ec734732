//! Internal link and anchor validation for the Markdown sources of the site.
//!
//! The docs directory holds one subdirectory per published section; a page
//! `docs/<section>/<page>.md` is served at `<prefix>/<section>/<page>/`.

use anyhow::{bail, Context, Result};
use regex_lite::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

lazy_static::lazy_static! {
    static ref LINK: Regex =
        Regex::new(r#"\[([^\]]+)\]\(([^\s)]+)(?:\s+["'].*?["'])?\)"#).unwrap();
    static ref HEADING: Regex = Regex::new(r"^(#{1,6})\s+(.+?)(?:\s*#+\s*)?$").unwrap();
    static ref HYPHENS: Regex = Regex::new(r"-+").unwrap();
}

/// Heading text to the id kramdown generates for it
pub fn anchor_id(text: &str) -> String {
    let filtered: String = text
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .map(|c| if c == ' ' { '-' } else { c })
        .collect();
    HYPHENS
        .replace_all(&filtered, "-")
        .trim_matches('-')
        .to_string()
}

/// Anchor id to heading text for every heading of a Markdown document.
/// Repeated ids get `-1`, `-2`, ... appended in order of appearance.
pub fn extract_headings(content: &str) -> BTreeMap<String, String> {
    let mut headings = BTreeMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for line in content.lines() {
        let Some(caps) = HEADING.captures(line) else {
            continue;
        };
        let text = caps[2].trim().to_string();
        let id = anchor_id(&text);

        match counts.get_mut(&id) {
            Some(count) => {
                *count += 1;
                headings.insert(format!("{}-{}", id, count), text);
            }
            None => {
                counts.insert(id.clone(), 0);
                headings.insert(id, text);
            }
        }
    }
    headings
}

/// `(text, url)` of every Markdown link on a line
pub fn extract_links(line: &str) -> Vec<(String, String)> {
    LINK.captures_iter(line)
        .map(|c| {
            let url = c[2].trim_matches(|ch: char| ch == '"' || ch == '\'').to_string();
            (c[1].to_string(), url)
        })
        .collect()
}

/// A link that does not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    pub file: PathBuf,
    pub line: usize,
    pub text: String,
    pub url: String,
    pub reason: String,
}

impl std::fmt::Display for BrokenLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: [{}]({}) -> {}",
            self.file.display(),
            self.line,
            self.text,
            self.url,
            self.reason
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct LinkReport {
    pub total: usize,
    pub valid: usize,
    pub external: usize,
    pub broken: Vec<BrokenLink>,
}

#[derive(Debug, Default, Clone)]
pub struct AnchorReport {
    pub total: usize,
    pub valid: usize,
    pub broken: Vec<BrokenLink>,
}

pub struct LinkChecker {
    docs_dir: PathBuf,
    internal: Regex,
}

impl LinkChecker {
    /// Sections are the immediate subdirectories of `docs_dir`
    pub fn new(docs_dir: &Path, prefix: &str) -> Result<Self> {
        if !docs_dir.is_dir() {
            bail!("Docs directory not found: {}", docs_dir.display());
        }

        let mut sections = Vec::new();
        for entry in fs::read_dir(docs_dir)
            .with_context(|| format!("Failed to list {}", docs_dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                sections.push(regex_lite::escape(&entry.file_name().to_string_lossy()));
            }
        }
        sections.sort();

        let prefix = prefix.trim_end_matches('/');
        let internal = Regex::new(&format!(
            r"^{}/({})(?:/(.*))?$",
            regex_lite::escape(prefix),
            sections.join("|")
        ))
        .context("Failed to build internal link pattern")?;

        Ok(Self {
            docs_dir: docs_dir.to_path_buf(),
            internal,
        })
    }

    /// Markdown file an internal URL points at, or `None` for other URLs
    pub fn target_file(&self, url: &str) -> Option<PathBuf> {
        let caps = self.internal.captures(url)?;
        let section = &caps[1];
        let page = caps.get(2).map_or("", |m| m.as_str());
        let page = page.split('#').next().unwrap_or_default().trim_end_matches('/');
        let page = if page.is_empty() { "index" } else { page };
        Some(self.docs_dir.join(section).join(format!("{}.md", page)))
    }

    fn markdown_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.docs_dir).sort_by_file_name() {
            let entry = entry?;
            let is_md = entry.path().extension().map_or(false, |ext| ext == "md");
            if entry.file_type().is_file() && is_md {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.docs_dir).unwrap_or(path)
    }

    /// Check that every internal link points at an existing page
    pub fn check_links(&self) -> Result<LinkReport> {
        let mut report = LinkReport::default();

        for file in self.markdown_files()? {
            let content = match fs::read_to_string(&file) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "could not read file");
                    continue;
                }
            };

            for (idx, line) in content.lines().enumerate() {
                for (text, url) in extract_links(line) {
                    report.total += 1;
                    match self.target_file(&url) {
                        Some(target) if target.exists() => report.valid += 1,
                        Some(target) => report.broken.push(BrokenLink {
                            file: self.relative(&file).to_path_buf(),
                            line: idx + 1,
                            text,
                            url,
                            reason: format!("Expected: {}", target.display()),
                        }),
                        None => report.external += 1,
                    }
                }
            }
        }
        Ok(report)
    }

    /// Check same-page `#anchor` links and internal `page#anchor` links
    pub fn check_anchors(&self) -> Result<AnchorReport> {
        let mut report = AnchorReport::default();
        let mut headings: HashMap<PathBuf, BTreeMap<String, String>> = HashMap::new();

        let files = self.markdown_files()?;
        let mut contents = Vec::with_capacity(files.len());
        for file in files {
            match fs::read_to_string(&file) {
                Ok(content) => {
                    headings.insert(file.clone(), extract_headings(&content));
                    contents.push((file, content));
                }
                Err(e) => warn!(path = %file.display(), error = %e, "could not read file"),
            }
        }

        for (file, content) in &contents {
            for (idx, line) in content.lines().enumerate() {
                for (text, url) in extract_links(line) {
                    if url.contains("{{") || url.contains("{%") {
                        continue;
                    }

                    let (anchor, target) = if let Some(anchor) = url.strip_prefix('#') {
                        (anchor.to_string(), Some(file.clone()))
                    } else if let Some((_, anchor)) = url.split_once('#') {
                        match self.target_file(&url) {
                            Some(target) => (anchor.to_string(), Some(target)),
                            None => continue,
                        }
                    } else {
                        continue;
                    };
                    if anchor.is_empty() {
                        continue;
                    }

                    report.total += 1;
                    let mut broken = |reason: String| {
                        report.broken.push(BrokenLink {
                            file: self.relative(file).to_path_buf(),
                            line: idx + 1,
                            text: text.clone(),
                            url: url.clone(),
                            reason,
                        })
                    };

                    let Some(target) = target.filter(|t| t.exists()) else {
                        broken(format!("Target file not found for {}", url));
                        continue;
                    };
                    let Some(target_headings) = headings.get(&target) else {
                        broken(format!("Could not read target file {}", target.display()));
                        continue;
                    };

                    let wanted = anchor.to_lowercase();
                    if target_headings.contains_key(&wanted) {
                        report.valid += 1;
                        continue;
                    }

                    let similar: Vec<&str> = target_headings
                        .keys()
                        .filter(|h| h.contains(&wanted) || wanted.contains(h.as_str()))
                        .take(3)
                        .map(String::as_str)
                        .collect();
                    let hint = if similar.is_empty() {
                        String::new()
                    } else {
                        format!(" (similar: {})", similar.join(", "))
                    };
                    broken(format!(
                        "Anchor '#{}' not found in {}{}",
                        anchor,
                        self.relative(&target).display(),
                        hint
                    ));
                }
            }
        }

        Ok(report)
    }
}
