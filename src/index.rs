//! Sitemap index files (`<sitemapindex>`).
//!
//! An index lists sitemap files, for sites whose URLs don't fit a single
//! sitemap. Entries can be written one by one with
//! [`IndexFile::write_sitemap`], or discovered from a directory:
//!
//! ```text
//! public/sitemap/
//! ├── sitemap.xml          → <sitemap><loc>{base_url}/sitemap.xml</loc><lastmod>mtime</lastmod></sitemap>
//! ├── sitemap-2.xml        → <sitemap><loc>{base_url}/sitemap-2.xml</loc>…
//! ├── archive.gzip         → <sitemap><loc>{base_url}/archive.gzip</loc>…
//! ├── robots.txt           (not matched)
//! └── sitemap_index.xml    (the index itself, skipped)
//! ```
//!
//! Discovery only looks at the top level of the directory and visits files in
//! file-name order, so the same directory always produces the same index.

use crate::encode::{self, LastModified};
use crate::writer::{
    Envelope, FileOptions, RootTag, SITEMAP_NAMESPACE, WriterError, XML_HEADER, XmlFile,
};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

pub const DEFAULT_INDEX_FILE_NAME: &str = "sitemap_index.xml";
/// File-name patterns picked up by [`IndexFile::write_up_from_path`].
pub const DEFAULT_DISCOVERY_PATTERNS: &[&str] = &["*.xml", "*.gzip"];

#[derive(Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid discovery pattern: {0}")]
    Glob(#[from] globset::Error),
    #[error("Unable to find sitemap files under the path '{0}'")]
    Discovery(PathBuf),
}

/// `<?xml …?><sitemapindex xmlns="…">…</sitemapindex>`
pub fn sitemapindex_envelope() -> Envelope {
    Envelope {
        header: XML_HEADER.to_string(),
        root_tag: Some(RootTag::new("sitemapindex").attribute("xmlns", SITEMAP_NAMESPACE)),
        footer: String::new(),
    }
}

pub struct IndexFile {
    file: XmlFile,
    base_url: String,
    patterns: Vec<String>,
}

impl IndexFile {
    /// An index at `path` whose discovered entries live under `base_url`.
    pub fn new(path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self::with_options(path, base_url, FileOptions::default())
    }

    pub fn with_options(
        path: impl Into<PathBuf>,
        base_url: impl Into<String>,
        options: FileOptions,
    ) -> Self {
        Self {
            file: XmlFile::new(path, sitemapindex_envelope(), options),
            base_url: base_url.into(),
            patterns: DEFAULT_DISCOVERY_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    /// Replace the file-name patterns used for discovery.
    pub fn patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Base URL of the directory holding the sitemap files.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn entries_count(&self) -> usize {
        self.file.entries_count()
    }

    pub fn is_entries_limit_reached(&self) -> bool {
        self.file.is_entries_limit_reached()
    }

    pub fn write(&mut self, content: &str) -> Result<usize, IndexError> {
        Ok(self.file.write(content)?)
    }

    pub fn close(&mut self) -> Result<(), IndexError> {
        Ok(self.file.close()?)
    }

    /// Write one `<sitemap>` block. Returns the number of bytes written.
    pub fn write_sitemap(
        &mut self,
        loc: &str,
        last_modified: Option<LastModified>,
    ) -> Result<usize, IndexError> {
        self.file.increment_entry()?;
        let xml = encode::encode_index_entry(loc, last_modified.as_ref());
        Ok(self.file.write(&xml)?)
    }

    /// Write the entry for the sitemap file at `path`: its name under
    /// `base_url`, last modified at its mtime (UTC date).
    pub fn write_sitemap_file(&mut self, path: &Path) -> Result<usize, IndexError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified: DateTime<Utc> = fs::metadata(path)?.modified()?.into();
        let loc = format!("{}/{name}", self.base_url.trim_end_matches('/'));
        self.write_sitemap(
            &loc,
            Some(LastModified::Text(modified.format("%Y-%m-%d").to_string())),
        )
    }

    /// Fill the index from the sitemap files found in `dir`, then close it.
    ///
    /// Returns the number of entries written.
    pub fn write_up_from_path(&mut self, dir: &Path) -> Result<usize, IndexError> {
        let files = self.discover(dir)?;
        if files.is_empty() {
            return Err(IndexError::Discovery(dir.to_path_buf()));
        }

        for file in &files {
            self.write_sitemap_file(file)?;
        }
        self.close()?;
        info!(
            index = %self.path().display(),
            dir = %dir.display(),
            count = files.len(),
            "wrote sitemap index"
        );
        Ok(files.len())
    }

    /// [`write_up_from_path`](Self::write_up_from_path) over the index's own
    /// directory.
    pub fn write_up(&mut self) -> Result<usize, IndexError> {
        let dir = self.file.dir().to_path_buf();
        self.write_up_from_path(&dir)
    }

    /// Sitemap files directly inside `dir`, sorted by name, minus this index.
    fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
        let matcher = build_matcher(&self.patterns)?;
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() || !matcher.is_match(entry.file_name()) {
                continue;
            }
            if same_file(entry.path(), self.file.path()) {
                continue;
            }
            files.push(entry.into_path());
        }
        Ok(files)
    }
}

fn build_matcher(patterns: &[String]) -> Result<GlobSet, IndexError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
