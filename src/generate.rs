//! Sitemap generation from an entry list.
//!
//! Reads URL entries as JSON Lines, writes them into as many sitemap files as
//! the entry limit requires, then writes an index listing exactly the files
//! this run wrote. Numbered files left over from an earlier, larger run are
//! not listed.
//!
//! ## Input Format
//!
//! One JSON object per line. Either `loc` (an absolute URL) or `route` (a path
//! resolved against `site_url`, with optional string `params`) locates the
//! page; every other key is a URL option:
//!
//! ```text
//! {"loc": "https://example.com/", "priority": 1.0}
//! {"loc": "https://example.com/about", "last_modified": "2024-03-01", "change_frequency": "monthly"}
//! {"route": "posts/view", "params": {"id": "7"}, "images": [{"loc": "https://example.com/7.jpg"}]}
//! ```
//!
//! Blank lines are skipped. An unknown option key fails the run with the line
//! number, and the offending entry is never written.
//!
//! ## Output Structure
//!
//! ```text
//! sitemap/
//! ├── sitemap.xml          # first 50,000 entries
//! ├── sitemap-2.xml        # next 50,000
//! ├── ...
//! └── sitemap_index.xml    # one <sitemap> per file above
//! ```

use crate::config::SitemapConfig;
use crate::index::{IndexError, IndexFile};
use crate::resolve::{BaseUrlResolver, Location, ResolveError, Route};
use crate::sitemap::{SitemapError, SitemapFile};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Line {line}: {message}")]
    Record { line: usize, message: String },
    #[error("Line {line}: {source}")]
    Sitemap {
        line: usize,
        #[source]
        source: SitemapError,
    },
    #[error("Sitemap error: {0}")]
    Close(#[from] SitemapError),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("URL resolution error: {0}")]
    Resolve(#[from] ResolveError),
}

/// One written sitemap file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
}

/// What a generation run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub sitemaps: Vec<SitemapSummary>,
    pub index_path: PathBuf,
    pub index_entries: usize,
}

impl GenerateReport {
    pub fn total_entries(&self) -> usize {
        self.sitemaps.iter().map(|s| s.entries).sum()
    }
}

/// File name of the `n`-th sitemap (1-based): `sitemap.xml`, `sitemap-2.xml`, …
pub fn numbered_file_name(file_name: &str, n: usize) -> String {
    if n <= 1 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{n}.{ext}"),
        None => format!("{file_name}-{n}"),
    }
}

/// Split a JSON record into its location and the remaining option map.
fn parse_record(line: usize, record: Value) -> Result<(Location, Map<String, Value>), GenerateError> {
    let record_error = |message: &str| GenerateError::Record {
        line,
        message: message.to_string(),
    };
    let Value::Object(mut map) = record else {
        return Err(record_error("entry must be a JSON object"));
    };

    let location = match (map.remove("loc"), map.remove("route")) {
        (Some(Value::String(loc)), None) => Location::Url(loc),
        (None, Some(Value::String(path))) => {
            let mut route = Route::new(path);
            match map.remove("params") {
                Some(Value::Object(params)) => {
                    for (key, value) in params {
                        match value {
                            Value::String(value) => route = route.param(key, value),
                            other => route = route.param(key, other.to_string()),
                        }
                    }
                }
                Some(_) => return Err(record_error("\"params\" must be an object")),
                None => {}
            }
            Location::Route(route)
        }
        (Some(_), Some(_)) => return Err(record_error("entry has both \"loc\" and \"route\"")),
        (None, None) => return Err(record_error("entry needs \"loc\" or \"route\"")),
        _ => return Err(record_error("\"loc\" and \"route\" must be strings")),
    };
    Ok((location, map))
}

/// Open the `n`-th sitemap file in `output_dir`.
fn sitemap_file(
    config: &SitemapConfig,
    output_dir: &Path,
    n: usize,
) -> Result<SitemapFile, GenerateError> {
    let path = output_dir.join(numbered_file_name(&config.file_name, n));
    let mut sitemap =
        SitemapFile::with_options(path, config.file_options()).defaults(config.defaults.clone());
    if let Some(site_url) = &config.site_url {
        sitemap = sitemap.resolver(BaseUrlResolver::new(site_url)?);
    }
    Ok(sitemap)
}

fn index_file(config: &SitemapConfig, path: &Path) -> IndexFile {
    IndexFile::with_options(path, config.index_base_url(), config.index_file_options())
        .patterns(config.files.discovery_patterns.clone())
}

fn finish(sitemap: &mut SitemapFile) -> Result<SitemapSummary, GenerateError> {
    let entries = sitemap.entries_count();
    sitemap.close()?;
    Ok(SitemapSummary {
        path: sitemap.path().to_path_buf(),
        entries,
        bytes: sitemap.bytes_written(),
    })
}

/// Write the entries in `input` as sitemaps under `output_dir`, plus an index.
pub fn generate(
    input: &Path,
    config: &SitemapConfig,
    output_dir: &Path,
) -> Result<GenerateReport, GenerateError> {
    let content = fs::read_to_string(input)?;

    let mut sitemaps = Vec::new();
    let mut current = sitemap_file(config, output_dir, 1)?;
    for (i, raw) in content.lines().enumerate() {
        let line = i + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let record: Value =
            serde_json::from_str(raw).map_err(|source| GenerateError::Json { line, source })?;
        let (location, options) = parse_record(line, record)?;

        if current.is_entries_limit_reached() {
            sitemaps.push(finish(&mut current)?);
            current = sitemap_file(config, output_dir, sitemaps.len() + 1)?;
            debug!(path = %current.path().display(), "rolled over to next sitemap file");
        }
        current
            .write_url_map(location, options, None)
            .map_err(|source| GenerateError::Sitemap { line, source })?;
    }
    // An input with no entries still yields one (empty) sitemap.
    current.open()?;
    sitemaps.push(finish(&mut current)?);

    let index_path = output_dir.join(&config.index_file_name);
    let mut index = index_file(config, &index_path);
    for sitemap in &sitemaps {
        index.write_sitemap_file(&sitemap.path)?;
    }
    let index_entries = index.entries_count();
    index.close()?;
    info!(index = %index_path.display(), count = index_entries, "wrote sitemap index");

    Ok(GenerateReport {
        sitemaps,
        index_path,
        index_entries,
    })
}

/// Write only the index, over whatever sitemap files are in `output_dir`.
pub fn generate_index(config: &SitemapConfig, output_dir: &Path) -> Result<(PathBuf, usize), GenerateError> {
    let index_path = output_dir.join(&config.index_file_name);
    let count = index_file(config, &index_path).write_up()?;
    Ok((index_path, count))
}
