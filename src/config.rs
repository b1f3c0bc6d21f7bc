//! Generator configuration.
//!
//! Handles loading, validating, and merging `sitemap.toml`. Stock defaults
//! are overridden by whatever the user file sets; the file itself is optional.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! site_url = "https://example.com"            # Resolves route entries (unset = routes rejected)
//! sitemap_base_url = "https://example.com/sitemap" # Public URL of the output directory
//!                                            # (unset = site_url + "/sitemap")
//! output_dir = "sitemap"
//! file_name = "sitemap.xml"
//! index_file_name = "sitemap_index.xml"
//!
//! [limits]
//! max_entries = 50000
//! max_bytes = 52428800
//! size_check = "on-close"   # or "on-write"
//!
//! [files]
//! dir_permissions = 0o777
//! discovery_patterns = ["*.xml", "*.gzip"]
//!
//! [defaults]                # Applied to every URL that doesn't set them
//! change_frequency = "daily"
//! priority = 0.5
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::encode::UrlOptions;
use crate::index::{DEFAULT_DISCOVERY_PATTERNS, DEFAULT_INDEX_FILE_NAME};
use crate::sitemap::DEFAULT_FILE_NAME;
use crate::writer::{
    DEFAULT_DIR_PERMISSIONS, DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES, FileOptions, SizeCheck,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "sitemap.toml";
/// Index base URL used when neither `sitemap_base_url` nor `site_url` is set.
pub const FALLBACK_SITEMAP_BASE_URL: &str = "http://localhost/sitemap";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `sitemap.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapConfig {
    /// Site root used to resolve route entries into absolute URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    /// Public URL of the directory the sitemap files are served from.
    /// Falls back to `site_url` + `/sitemap`; see [`Self::index_base_url`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap_base_url: Option<String>,
    /// Directory the sitemap and index files are written to.
    pub output_dir: String,
    /// Name of the first sitemap file; later files get a `-N` suffix.
    pub file_name: String,
    pub index_file_name: String,
    pub limits: LimitsConfig,
    pub files: FilesConfig,
    /// Options merged under every URL entry.
    pub defaults: UrlOptions,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            sitemap_base_url: None,
            output_dir: "sitemap".to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            index_file_name: DEFAULT_INDEX_FILE_NAME.to_string(),
            limits: LimitsConfig::default(),
            files: FilesConfig::default(),
            defaults: UrlOptions::default(),
        }
    }
}

impl SitemapConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_entries == 0 {
            return Err(ConfigError::Validation(
                "limits.max_entries must be greater than 0".into(),
            ));
        }
        if self.limits.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "limits.max_bytes must be greater than 0".into(),
            ));
        }
        if self.file_name.is_empty() || self.index_file_name.is_empty() {
            return Err(ConfigError::Validation(
                "file_name and index_file_name must not be empty".into(),
            ));
        }
        if self.file_name == self.index_file_name {
            return Err(ConfigError::Validation(
                "file_name and index_file_name must differ".into(),
            ));
        }
        if self.files.discovery_patterns.is_empty() {
            return Err(ConfigError::Validation(
                "files.discovery_patterns must not be empty".into(),
            ));
        }
        if let Some(site_url) = &self.site_url {
            url::Url::parse(site_url).map_err(|e| {
                ConfigError::Validation(format!("site_url is not a valid URL: {e}"))
            })?;
        }
        url::Url::parse(&self.index_base_url()).map_err(|e| {
            ConfigError::Validation(format!("sitemap_base_url is not a valid URL: {e}"))
        })?;
        self.defaults
            .validate()
            .map_err(|e| ConfigError::Validation(format!("defaults: {e}")))?;
        Ok(())
    }

    /// Base URL the index points its entries at.
    ///
    /// `sitemap_base_url` when set, else `site_url` + `/sitemap`, else
    /// [`FALLBACK_SITEMAP_BASE_URL`].
    pub fn index_base_url(&self) -> String {
        match (&self.sitemap_base_url, &self.site_url) {
            (Some(base_url), _) => base_url.clone(),
            (None, Some(site_url)) => format!("{}/sitemap", site_url.trim_end_matches('/')),
            (None, None) => FALLBACK_SITEMAP_BASE_URL.to_string(),
        }
    }

    /// Writer settings for the index file.
    ///
    /// `limits.max_entries` caps URLs per sitemap, not sitemaps per index, so
    /// the index keeps the protocol's own entry limit.
    pub fn index_file_options(&self) -> FileOptions {
        FileOptions {
            max_entries: DEFAULT_MAX_ENTRIES,
            ..self.file_options()
        }
    }

    /// Writer settings derived from `[limits]` and `[files]`.
    pub fn file_options(&self) -> FileOptions {
        FileOptions {
            max_entries: self.limits.max_entries,
            max_bytes: self.limits.max_bytes,
            dir_permissions: self.files.dir_permissions,
            size_check: self.limits.size_check,
        }
    }
}

/// Per-file limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Max entries per file (the protocol allows 50,000).
    pub max_entries: usize,
    /// Max bytes per file, uncompressed (the protocol allows 50 MiB).
    pub max_bytes: u64,
    pub size_check: SizeCheck,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
            size_check: SizeCheck::default(),
        }
    }
}

/// Filesystem settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    /// Mode bits for created directories (Unix only).
    pub dir_permissions: u32,
    /// File-name globs an index picks up from the output directory.
    pub discovery_patterns: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            dir_permissions: DEFAULT_DIR_PERMISSIONS,
            discovery_patterns: DEFAULT_DISCOVERY_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SitemapConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `sitemap.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `sitemap.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `sitemap.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<SitemapConfig, ConfigError> {
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: SitemapConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `sitemap.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Sitemap Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Site root used to turn route entries ({"route": "..."}) into absolute URLs.
# Without it, route entries are rejected.
# site_url = "https://example.com"

# Public URL of the directory the sitemap files are served from.
# Index entries point at "<sitemap_base_url>/<file name>".
# Defaults to "<site_url>/sitemap", or "http://localhost/sitemap" when
# site_url is unset too.
# sitemap_base_url = "https://example.com/sitemap"

# Directory the sitemap and index files are written to.
output_dir = "sitemap"

# Name of the first sitemap file. When it fills up, writing continues in
# sitemap-2.xml, sitemap-3.xml, ...
file_name = "sitemap.xml"

# Name of the sitemap index file.
index_file_name = "sitemap_index.xml"

# ---------------------------------------------------------------------------
# Per-file limits
# ---------------------------------------------------------------------------
[limits]
# Max entries per file. The sitemaps protocol allows 50,000.
max_entries = 50000

# Max uncompressed size per file in bytes. The protocol allows 50 MiB.
max_bytes = 52428800

# When the size limit is checked:
#   "on-close" - after the file is written (an oversized file is kept)
#   "on-write" - before every write (nothing over the limit reaches disk)
size_check = "on-close"

# ---------------------------------------------------------------------------
# Filesystem
# ---------------------------------------------------------------------------
[files]
# Permission bits for directories created on the way (Unix only).
dir_permissions = 0o777

# File-name patterns the index picks up from the output directory.
discovery_patterns = ["*.xml", "*.gzip"]

# ---------------------------------------------------------------------------
# Default URL options, applied to every entry that doesn't set them
# ---------------------------------------------------------------------------
[defaults]
# change_frequency = "daily"   # always|hourly|daily|weekly|monthly|yearly|never
# priority = 0.5               # 0.0 - 1.0
# last_modified = "2024-01-01" # date string or Unix timestamp
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::ChangeFrequency;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_protocol_limits() {
        let config = SitemapConfig::default();
        assert_eq!(config.limits.max_entries, 50_000);
        assert_eq!(config.limits.max_bytes, 52_428_800);
        assert_eq!(config.limits.size_check, SizeCheck::OnClose);
        assert_eq!(config.files.dir_permissions, 0o777);
    }

    #[test]
    fn default_config_has_file_names() {
        let config = SitemapConfig::default();
        assert_eq!(config.file_name, "sitemap.xml");
        assert_eq!(config.index_file_name, "sitemap_index.xml");
        assert_eq!(config.files.discovery_patterns, vec!["*.xml", "*.gzip"]);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
sitemap_base_url = "https://example.com/maps"

[limits]
max_entries = 1000
"##;
        let config: SitemapConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.sitemap_base_url.as_deref(), Some("https://example.com/maps"));
        assert_eq!(config.index_base_url(), "https://example.com/maps");
        assert_eq!(config.limits.max_entries, 1000);
        // Unspecified defaults preserved
        assert_eq!(config.limits.max_bytes, 52_428_800);
        assert_eq!(config.output_dir, "sitemap");
    }

    #[test]
    fn parse_defaults_section() {
        let toml = r##"
[defaults]
change_frequency = "weekly"
priority = 0.4
last_modified = 1594771200
"##;
        let config: SitemapConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.defaults.change_frequency, Some(ChangeFrequency::Weekly));
        assert_eq!(config.defaults.priority, Some(0.4));
        assert_eq!(
            config.defaults.last_modified,
            Some(crate::encode::LastModified::Timestamp(1594771200))
        );
    }

    #[test]
    fn parse_octal_permissions_and_size_check() {
        let toml = r##"
[limits]
size_check = "on-write"

[files]
dir_permissions = 0o755
"##;
        let config: SitemapConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.limits.size_check, SizeCheck::OnWrite);
        assert_eq!(config.files.dir_permissions, 0o755);
    }

    #[test]
    fn file_options_mirror_config() {
        let mut config = SitemapConfig::default();
        config.limits.max_entries = 10;
        config.limits.size_check = SizeCheck::OnWrite;
        let options = config.file_options();
        assert_eq!(options.max_entries, 10);
        assert_eq!(options.size_check, SizeCheck::OnWrite);
        assert_eq!(options.max_bytes, 52_428_800);
    }

    #[test]
    fn index_options_keep_protocol_entry_limit() {
        let mut config = SitemapConfig::default();
        config.limits.max_entries = 2;
        config.limits.max_bytes = 4096;
        let options = config.index_file_options();
        assert_eq!(options.max_entries, DEFAULT_MAX_ENTRIES);
        assert_eq!(options.max_bytes, 4096);
    }

    #[test]
    fn index_base_url_prefers_explicit_setting() {
        let config = SitemapConfig {
            site_url: Some("https://example.com".into()),
            sitemap_base_url: Some("https://cdn.example.com/maps".into()),
            ..SitemapConfig::default()
        };
        assert_eq!(config.index_base_url(), "https://cdn.example.com/maps");
    }

    #[test]
    fn index_base_url_falls_back_to_site_url() {
        let config = SitemapConfig {
            site_url: Some("https://example.com/".into()),
            ..SitemapConfig::default()
        };
        assert_eq!(config.index_base_url(), "https://example.com/sitemap");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.sitemap_base_url, None);
        assert_eq!(config.index_base_url(), "http://localhost/sitemap");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r##"
site_url = "https://example.com"
output_dir = "public/sitemap"
"##,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.output_dir, "public/sitemap");
        assert_eq!(config.file_name, "sitemap.xml");
        assert_eq!(config.index_base_url(), "https://example.com/sitemap");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let toml = r##"max_entry = 5"##;
        let result: Result<SitemapConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let toml = r##"
[defaults]
colour = "red"
"##;
        let result: Result<SitemapConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[limits]\nmax_files = 3\n").unwrap();

        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[limits]\nmax_entries = 0\n").unwrap();

        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let config = SitemapConfig {
            sitemap_base_url: Some("not a url".into()),
            ..SitemapConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_clashing_file_names() {
        let config = SitemapConfig {
            index_file_name: "sitemap.xml".into(),
            ..SitemapConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_default_priority_out_of_range() {
        let config = SitemapConfig {
            defaults: UrlOptions::default().priority(3.0),
            ..SitemapConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        SitemapConfig::default().validate().unwrap();
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: SitemapConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SitemapConfig::default();
        assert_eq!(config.sitemap_base_url, defaults.sitemap_base_url);
        assert_eq!(config.limits.max_entries, defaults.limits.max_entries);
        assert_eq!(config.files.dir_permissions, defaults.files.dir_permissions);
        assert_eq!(config.defaults, defaults.defaults);
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[limits]\nmax_entries = 1\nmax_bytes = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[limits]\nmax_bytes = 5\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["limits"]["max_entries"].as_integer(), Some(1));
        assert_eq!(merged["limits"]["max_bytes"].as_integer(), Some(5));
    }
}
