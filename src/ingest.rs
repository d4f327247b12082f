//! Document loading: files, directories and web pages into chunks.
//!
//! Supported inputs:
//! - `.txt` and `.md` files, read as UTF-8
//! - `.pdf` files, text extracted with `pdf-extract`
//! - directories, walked recursively and filtered by include globs
//! - URLs, fetched and stripped of HTML markup
//!
//! Everything ends up in [`chunk_text`](docbot_core::chunk::chunk_text)
//! with the configured window size.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use docbot_core::chunk::load_text;
use docbot_core::models::NewChunk;

use crate::config::ChunkingConfig;

/// Include globs used when none are given.
pub const DEFAULT_INCLUDE_GLOBS: &[&str] = &["**/*.md", "**/*.txt", "**/*.pdf"];

const DEFAULT_EXCLUDE_GLOBS: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

const URL_TIMEOUT_SECS: u64 = 30;

pub struct Loader {
    chunk_size: usize,
    overlap: usize,
}

impl Loader {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }

    pub fn load_text(&self, text: &str, source: &str) -> Vec<NewChunk> {
        load_text(text, source, self.chunk_size, self.overlap)
    }

    /// Load one file. The source is the file name.
    pub fn load_file(&self, path: &Path) -> Result<Vec<NewChunk>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let text = read_document(path)?;
        Ok(self.load_text(&text, &name))
    }

    /// Load every matching file under `dir`. The source of each chunk is the
    /// file's path relative to `dir`. Unreadable files are skipped.
    pub fn load_directory(&self, dir: &Path, include_globs: &[String]) -> Result<Vec<NewChunk>> {
        if !dir.is_dir() {
            bail!("Not a directory: {}", dir.display());
        }

        let include_set = if include_globs.is_empty() {
            build_globset(DEFAULT_INCLUDE_GLOBS.iter().copied())?
        } else {
            build_globset(include_globs.iter().map(String::as_str))?
        };
        let exclude_set = build_globset(DEFAULT_EXCLUDE_GLOBS.iter().copied())?;

        let mut files = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(dir).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();
            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }
            files.push((rel_str, path.to_path_buf()));
        }
        files.sort();

        let mut chunks = Vec::new();
        for (rel, path) in files {
            match read_document(&path) {
                Ok(text) => {
                    let loaded = self.load_text(&text, &rel);
                    info!(file = %rel, chunks = loaded.len(), "loaded file");
                    chunks.extend(loaded);
                }
                Err(e) => warn!(file = %rel, error = %e, "skipping file"),
            }
        }
        Ok(chunks)
    }

    /// Fetch `url` and chunk its text. HTML is reduced to visible text.
    pub async fn load_url(&self, url: &str) -> Result<Vec<NewChunk>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(URL_TIMEOUT_SECS))
            .build()?;
        let response = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;
        let status = response.status();
        if !status.is_success() {
            bail!("Fetching {} returned {}", url, status);
        }
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(false);
        let body = response.text().await?;

        let text = if is_html || body.trim_start().starts_with('<') {
            strip_html(&body)
        } else {
            body
        };
        Ok(self.load_text(&text, url))
    }
}

/// Read a supported document as plain text.
pub fn read_document(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "md" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        "pdf" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| anyhow::anyhow!("PDF extraction failed for {}: {}", path.display(), e))
        }
        other => bail!(
            "Unsupported file type '.{}' for {} (expected .txt, .md or .pdf)",
            other,
            path.display()
        ),
    }
}

fn build_globset<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduce an HTML page to its visible text.
///
/// Drops `<script>` and `<style>` blocks, removes tags, decodes the common
/// entities and collapses whitespace.
pub fn strip_html(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");

    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    SPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_core::chunk::chunk_text;
    use std::fs;

    fn loader() -> Loader {
        Loader::new(&ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 5,
        })
    }

    #[test]
    fn test_load_file_uses_file_name_as_source() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("staking.md");
        fs::write(&path, "Stake minimum is 100 tokens.").unwrap();

        let chunks = loader().load_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source, "staking.md");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn test_unsupported_extension_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data.csv");
        fs::write(&path, "a,b").unwrap();
        let err = loader().load_file(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn test_load_directory_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("guides")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("b.md"), "Bravo document.").unwrap();
        fs::write(root.join("guides/a.txt"), "Alpha guide.").unwrap();
        fs::write(root.join("image.png"), "not text").unwrap();
        fs::write(root.join("node_modules/pkg/readme.md"), "vendored").unwrap();

        let chunks = loader().load_directory(root, &[]).unwrap();
        let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["b.md", "guides/a.txt"]);

        let only_txt = loader()
            .load_directory(root, &["**/*.txt".to_string()])
            .unwrap();
        assert_eq!(only_txt.len(), 1);
    }

    #[test]
    fn test_long_text_is_chunked_with_contiguous_indices() {
        let text = "word ".repeat(40);
        let chunks = loader().load_text(&text, "long.md");
        assert!(chunks.len() > 1);
        assert_eq!(chunks.len(), chunk_text(&text, 40, 5).len());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
    }

    #[test]
    fn test_strip_html() {
        let html = "<html><head><style>body { color: red }</style>\
                    <SCRIPT>alert('x')</SCRIPT></head>\
                    <body><h1>Staking</h1><p>Minimum&nbsp;is 100 &amp; up</p></body></html>";
        assert_eq!(strip_html(html), "Staking Minimum is 100 & up");
    }

    #[test]
    fn test_strip_html_non_ascii_page_drops_scripts() {
        let html = "<html><p>İstanbul meetup</p>\
                    <script type=\"text/javascript\">var secret = 'tracking';</script>\
                    <Style>\np { color: red }\n</Style></html>";
        assert_eq!(strip_html(html), "İstanbul meetup");
    }

    #[test]
    fn test_strip_html_multiline_script() {
        let html = "<p>Fees</p><script>\nif (a < b) {\n  track();\n}\n</script><p>are 1%</p>";
        assert_eq!(strip_html(html), "Fees are 1%");
    }
}
