//! Bounded streaming writer for one XML output file.
//!
//! [`XmlFile`] is the piece every sitemap kind is built on. It owns the file
//! handle, wraps whatever is written in an [`Envelope`] (header, root tag,
//! footer), and enforces the two protocol limits: entries per file and bytes
//! per file.
//!
//! ## Lifecycle
//!
//! ```text
//!            open()                       close()
//!  Closed ───────────▶ Open(handle) ───────────────▶ Closed
//!    │   header + <root …>      │   </root> + footer    │
//!    │                          │   flush, release      │
//!    │                          │   entries = 0         │
//!    │                          │   size check          │
//!    └── write() opens first ───┘                       │
//!                                 Drop closes if open ◀─┘
//! ```
//!
//! `open()` is idempotent and `write()` guards on it, so the first write
//! acquires the file. Dropping an open `XmlFile` closes it; errors at that
//! point can only be logged.
//!
//! ## Limits
//!
//! - **Entries**: [`XmlFile::increment_entry`] is called by the entry writers
//!   *before* an entry is encoded and written, so an entry over the limit never
//!   reaches the file.
//! - **Bytes**: by default ([`SizeCheck::OnClose`]) the persisted size is
//!   measured after closing. The oversized file stays on disk and the error is
//!   reported after the fact. [`SizeCheck::OnWrite`] instead refuses any write
//!   that would leave no room for the closing envelope.

use crate::encode;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Max `<url>`/`<sitemap>` entries per file allowed by the sitemaps protocol.
pub const DEFAULT_MAX_ENTRIES: usize = 50_000;
/// Max uncompressed file size allowed by the sitemaps protocol (50 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 52_428_800;
pub const DEFAULT_DIR_PERMISSIONS: u32 = 0o777;
pub const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Unable to resolve path '{path}': {reason}")]
    Path { path: PathBuf, reason: String },
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Entries count exceeds limit of {limit} at file '{path}'")]
    EntryLimitExceeded { limit: usize, path: PathBuf },
    #[error("File '{path}' exceeds the size limit of {limit} bytes: actual size {actual} bytes")]
    SizeLimitExceeded {
        limit: u64,
        actual: u64,
        path: PathBuf,
    },
}

/// Root element wrapped around all entries, e.g. `<urlset xmlns="…">`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootTag {
    pub name: String,
    /// Attributes in output order.
    pub attributes: Vec<(String, String)>,
}

impl RootTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }
}

/// Fixed content around the entries of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub header: String,
    pub root_tag: Option<RootTag>,
    pub footer: String,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            header: XML_HEADER.to_string(),
            root_tag: None,
            footer: String::new(),
        }
    }
}

impl Envelope {
    /// Header followed by the root opening tag.
    pub fn opening(&self) -> String {
        match &self.root_tag {
            Some(root) => format!(
                "{}{}",
                self.header,
                encode::start_tag(&root.name, &root.attributes)
            ),
            None => self.header.clone(),
        }
    }

    /// Root closing tag followed by the footer.
    pub fn closing(&self) -> String {
        match &self.root_tag {
            Some(root) => format!("{}{}", encode::end_tag(&root.name), self.footer),
            None => self.footer.clone(),
        }
    }
}

/// When the byte limit is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizeCheck {
    /// Measure the file after closing it; the file is kept either way.
    #[default]
    OnClose,
    /// Reject a write that would push the finished file over the limit.
    OnWrite,
}

/// Limits and filesystem settings for one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    pub max_entries: usize,
    pub max_bytes: u64,
    /// Mode bits for directories created on open (Unix only).
    pub dir_permissions: u32,
    pub size_check: SizeCheck,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
            dir_permissions: DEFAULT_DIR_PERMISSIONS,
            size_check: SizeCheck::default(),
        }
    }
}

enum FileState {
    Closed,
    Open(BufWriter<File>),
}

/// An XML file written front to back under entry and byte limits.
pub struct XmlFile {
    path: PathBuf,
    envelope: Envelope,
    options: FileOptions,
    state: FileState,
    entries: usize,
    bytes_written: u64,
}

impl XmlFile {
    pub fn new(path: impl Into<PathBuf>, envelope: Envelope, options: FileOptions) -> Self {
        Self {
            path: path.into(),
            envelope,
            options,
            state: FileState::Closed,
            entries: 0,
            bytes_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the file is written into.
    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn options(&self) -> &FileOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, FileState::Open(_))
    }

    /// Entries counted since the file was last closed.
    pub fn entries_count(&self) -> usize {
        self.entries
    }

    /// Bytes written since the file was last opened, envelope included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn is_entries_limit_reached(&self) -> bool {
        self.entries >= self.options.max_entries
    }

    /// Count one more entry, failing if that would exceed `max_entries`.
    ///
    /// The counter is left unchanged on failure.
    pub fn increment_entry(&mut self) -> Result<usize, WriterError> {
        let next = self.entries + 1;
        if next > self.options.max_entries {
            return Err(WriterError::EntryLimitExceeded {
                limit: self.options.max_entries,
                path: self.path.clone(),
            });
        }
        self.entries = next;
        Ok(next)
    }

    /// Create (or truncate) the file and write the opening envelope.
    ///
    /// No-op when already open.
    pub fn open(&mut self) -> Result<(), WriterError> {
        if self.is_open() {
            return Ok(());
        }
        resolve_dir(self.dir(), self.options.dir_permissions)?;
        let file = File::create(&self.path).map_err(|source| create_error(&self.path, source))?;
        self.state = FileState::Open(BufWriter::new(file));
        self.bytes_written = 0;
        debug!(path = %self.path.display(), "opened xml file");

        let opening = self.envelope.opening();
        self.write_raw(&opening)?;
        Ok(())
    }

    /// Append `content`, opening the file first if needed.
    pub fn write(&mut self, content: &str) -> Result<usize, WriterError> {
        self.open()?;
        if self.options.size_check == SizeCheck::OnWrite {
            let projected = self.bytes_written
                + content.len() as u64
                + self.envelope.closing().len() as u64;
            if projected > self.options.max_bytes {
                return Err(WriterError::SizeLimitExceeded {
                    limit: self.options.max_bytes,
                    actual: projected,
                    path: self.path.clone(),
                });
            }
        }
        self.write_raw(content)
    }

    fn write_raw(&mut self, content: &str) -> Result<usize, WriterError> {
        let FileState::Open(writer) = &mut self.state else {
            return Err(WriterError::Io {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::NotConnected, "file is not open"),
            });
        };
        writer
            .write_all(content.as_bytes())
            .map_err(|source| WriterError::Io {
                path: self.path.clone(),
                source,
            })?;
        self.bytes_written += content.len() as u64;
        Ok(content.len())
    }

    /// Write the closing envelope, release the handle and check the size.
    ///
    /// No-op when not open. The entry counter is reset and the handle is
    /// released even when writing the closing envelope fails.
    pub fn close(&mut self) -> Result<(), WriterError> {
        if !self.is_open() {
            return Ok(());
        }
        let closing = self.envelope.closing();
        let closed = self.write_raw(&closing);

        let state = std::mem::replace(&mut self.state, FileState::Closed);
        self.entries = 0;
        let flushed = match state {
            FileState::Open(mut writer) => writer.flush(),
            FileState::Closed => Ok(()),
        };
        closed?;
        flushed.map_err(|source| WriterError::Io {
            path: self.path.clone(),
            source,
        })?;

        let actual = fs::metadata(&self.path)
            .map_err(|source| WriterError::Io {
                path: self.path.clone(),
                source,
            })?
            .len();
        debug!(path = %self.path.display(), bytes = actual, "closed xml file");
        if actual > self.options.max_bytes {
            return Err(WriterError::SizeLimitExceeded {
                limit: self.options.max_bytes,
                actual,
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

impl Drop for XmlFile {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(path = %self.path.display(), error = %err, "failed to close xml file on drop");
        }
    }
}

/// Map a failed `File::create` to a writer error.
///
/// A permission failure means the directory is not writable for this user,
/// which is reported as a `Path` error on the directory like the other
/// directory checks.
fn create_error(path: &Path, source: io::Error) -> WriterError {
    if source.kind() == io::ErrorKind::PermissionDenied {
        return WriterError::Path {
            path: path.parent().unwrap_or(path).to_path_buf(),
            reason: format!("directory is not writable: {source}"),
        };
    }
    WriterError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Make sure `dir` exists and is writable, creating it with `mode` if missing.
///
/// The writability check only looks at the mode's write bits, not at the
/// current user; a directory owned by someone else is caught later when the
/// file is created (see [`create_error`]).
fn resolve_dir(dir: &Path, mode: u32) -> Result<(), WriterError> {
    let path_error = |reason: String| WriterError::Path {
        path: dir.to_path_buf(),
        reason,
    };
    if !dir.is_dir() {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder
            .create(dir)
            .map_err(|err| path_error(err.to_string()))?;
    }
    let metadata = fs::metadata(dir).map_err(|err| path_error(err.to_string()))?;
    if !metadata.is_dir() {
        return Err(path_error("not a directory".into()));
    }
    if metadata.permissions().readonly() {
        return Err(path_error("directory should be writable".into()));
    }
    Ok(())
}
