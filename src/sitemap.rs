//! URL sitemap files (`<urlset>`).
//!
//! [`SitemapFile`] is a thin layer over [`XmlFile`]: it supplies the `urlset`
//! envelope, turns each call into a `<url>` fragment via [`crate::encode`],
//! and hands the fragment to the writer.
//!
//! ```rust,no_run
//! use simple_sitemap::encode::{ChangeFrequency, UrlOptions};
//! use simple_sitemap::sitemap::SitemapFile;
//!
//! let mut sitemap = SitemapFile::new("public/sitemap/sitemap.xml");
//! sitemap.write_url("https://example.com/", UrlOptions::default().priority(1.0))?;
//! sitemap.write_url(
//!     "https://example.com/contact",
//!     UrlOptions::default()
//!         .last_modified("2012-06-28")
//!         .change_frequency(ChangeFrequency::Monthly),
//! )?;
//! sitemap.close()?;
//! # Ok::<(), simple_sitemap::sitemap::SitemapError>(())
//! ```
//!
//! ## Order of Operations per URL
//!
//! 1. Count the entry (fails once the file is full, before anything else)
//! 2. Resolve a [`Route`](crate::resolve::Route) to a URL
//! 3. Merge the caller's options over the configured defaults and validate
//! 4. Encode the whole `<url>` block in memory
//! 5. Write it
//!
//! An entry rejected at steps 2–4 still counts against the file's entry
//! limit, but none of its bytes are written.

use crate::encode::{self, EncodeError, UrlOptions};
use crate::resolve::{Location, ResolveError, UrlResolver};
use crate::writer::{
    Envelope, FileOptions, RootTag, SITEMAP_NAMESPACE, WriterError, XML_HEADER, XmlFile,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_FILE_NAME: &str = "sitemap.xml";
pub const IMAGE_NAMESPACE: &str = "http://www.google.com/schemas/sitemap-image/1.1";
pub const VIDEO_NAMESPACE: &str = "http://www.google.com/schemas/sitemap-video/1.1";

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("URL resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Route '{0}' needs a URL resolver, none configured")]
    NoResolver(String),
}

/// `<?xml …?><urlset xmlns="…" xmlns:image="…" xmlns:video="…">…</urlset>`
pub fn urlset_envelope() -> Envelope {
    Envelope {
        header: XML_HEADER.to_string(),
        root_tag: Some(
            RootTag::new("urlset")
                .attribute("xmlns", SITEMAP_NAMESPACE)
                .attribute("xmlns:image", IMAGE_NAMESPACE)
                .attribute("xmlns:video", VIDEO_NAMESPACE),
        ),
        footer: String::new(),
    }
}

pub struct SitemapFile {
    file: XmlFile,
    defaults: UrlOptions,
    resolver: Option<Box<dyn UrlResolver>>,
}

impl SitemapFile {
    /// A sitemap at `path` with protocol-default limits.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, FileOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: FileOptions) -> Self {
        Self::with_envelope(path, urlset_envelope(), options)
    }

    /// A sitemap with a custom header, root tag or footer.
    pub fn with_envelope(path: impl Into<PathBuf>, envelope: Envelope, options: FileOptions) -> Self {
        Self {
            file: XmlFile::new(path, envelope, options),
            defaults: UrlOptions::default(),
            resolver: None,
        }
    }

    /// Options applied to every URL unless the call sets them.
    pub fn defaults(mut self, defaults: UrlOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn resolver(mut self, resolver: impl UrlResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn entries_count(&self) -> usize {
        self.file.entries_count()
    }

    pub fn bytes_written(&self) -> u64 {
        self.file.bytes_written()
    }

    pub fn is_entries_limit_reached(&self) -> bool {
        self.file.is_entries_limit_reached()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_open()
    }

    pub fn open(&mut self) -> Result<(), SitemapError> {
        Ok(self.file.open()?)
    }

    /// Append raw content inside the `<urlset>` without counting an entry.
    pub fn write(&mut self, content: &str) -> Result<usize, SitemapError> {
        Ok(self.file.write(content)?)
    }

    pub fn close(&mut self) -> Result<(), SitemapError> {
        Ok(self.file.close()?)
    }

    /// Write one `<url>` block. Returns the number of bytes written.
    pub fn write_url(
        &mut self,
        location: impl Into<Location>,
        options: UrlOptions,
    ) -> Result<usize, SitemapError> {
        self.write_url_with_xml(location, options, None)
    }

    /// Like [`write_url`](Self::write_url), appending `extra_xml` verbatim
    /// just before `</url>` (e.g. a `<news:news>` block).
    pub fn write_url_with_xml(
        &mut self,
        location: impl Into<Location>,
        options: UrlOptions,
        extra_xml: Option<&str>,
    ) -> Result<usize, SitemapError> {
        self.file.increment_entry()?;
        self.write_counted(location.into(), options, extra_xml)
    }

    /// Write one `<url>` block from an untyped option map.
    ///
    /// Unknown keys fail with [`EncodeError::UnrecognizedOptions`] and nothing
    /// is written for the call.
    pub fn write_url_map(
        &mut self,
        location: impl Into<Location>,
        options: serde_json::Map<String, serde_json::Value>,
        extra_xml: Option<&str>,
    ) -> Result<usize, SitemapError> {
        self.file.increment_entry()?;
        let options = UrlOptions::from_map(options)?;
        self.write_counted(location.into(), options, extra_xml)
    }

    fn write_counted(
        &mut self,
        location: Location,
        options: UrlOptions,
        extra_xml: Option<&str>,
    ) -> Result<usize, SitemapError> {
        let loc = self.resolve(location)?;
        let options = options.merged_over(&self.defaults);
        options.validate()?;
        let xml = encode::encode_url(&loc, &options, extra_xml)?;
        Ok(self.file.write(&xml)?)
    }

    fn resolve(&self, location: Location) -> Result<String, SitemapError> {
        match location {
            Location::Url(url) => Ok(url),
            Location::Route(route) => match &self.resolver {
                Some(resolver) => Ok(resolver.resolve(&route)?),
                None => Err(SitemapError::NoResolver(route.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{ChangeFrequency, ImageEntry};
    use crate::resolve::{BaseUrlResolver, Route};
    use crate::test_helpers::{assert_well_formed, read};
    use serde_json::json;
    use tempfile::TempDir;

    fn sitemap_in(tmp: &TempDir) -> SitemapFile {
        SitemapFile::new(tmp.path().join(DEFAULT_FILE_NAME))
    }

    fn options_map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_sitemap_has_urlset_envelope() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);

        sitemap.write("").unwrap();
        sitemap.close().unwrap();

        let content = read(sitemap.path());
        assert!(content.starts_with(XML_HEADER));
        assert!(content.contains("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\""));
        assert!(content.ends_with("</urlset>"));
        assert_well_formed(&content);
    }

    #[test]
    fn write_url_with_all_scalar_options() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);

        sitemap
            .write_url(
                "http://test.url",
                UrlOptions::default()
                    .last_modified("2010-07-15")
                    .change_frequency(ChangeFrequency::Daily)
                    .priority(0.2),
            )
            .unwrap();
        sitemap.close().unwrap();

        let content = read(sitemap.path());
        assert_eq!(content.matches("<url>").count(), 1);
        assert!(content.contains(
            "<url><loc>http://test.url</loc><lastmod>2010-07-15</lastmod>\
             <changefreq>daily</changefreq><priority>0.2</priority></url>"
        ));
        assert_well_formed(&content);
    }

    #[test]
    fn write_url_returns_fragment_length() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);

        let bytes = sitemap.write_url("http://a", UrlOptions::default()).unwrap();
        assert_eq!(bytes, "<url><loc>http://a</loc></url>".len());
    }

    #[test]
    fn entries_count_follows_writes_and_resets() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);
        assert_eq!(sitemap.entries_count(), 0);

        sitemap.write_url("http://a/1", UrlOptions::default()).unwrap();
        assert_eq!(sitemap.entries_count(), 1);
        sitemap.write_url("http://a/2", UrlOptions::default()).unwrap();
        assert_eq!(sitemap.entries_count(), 2);

        sitemap.close().unwrap();
        assert_eq!(sitemap.entries_count(), 0);
    }

    #[test]
    fn entry_beyond_limit_is_not_written() {
        let tmp = TempDir::new().unwrap();
        let options = FileOptions {
            max_entries: 2,
            ..FileOptions::default()
        };
        let mut sitemap = SitemapFile::with_options(tmp.path().join("s.xml"), options);

        sitemap.write_url("http://a/1", UrlOptions::default()).unwrap();
        sitemap.write_url("http://a/2", UrlOptions::default()).unwrap();
        let bytes = sitemap.bytes_written();

        let result = sitemap.write_url("http://a/3", UrlOptions::default());
        assert!(matches!(
            result,
            Err(SitemapError::Writer(WriterError::EntryLimitExceeded { .. }))
        ));
        assert_eq!(sitemap.bytes_written(), bytes);

        sitemap.close().unwrap();
        assert!(!read(sitemap.path()).contains("http://a/3"));
    }

    #[test]
    fn defaults_fill_unset_options() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp).defaults(
            UrlOptions::default()
                .change_frequency(ChangeFrequency::Weekly)
                .priority(0.5),
        );

        sitemap
            .write_url("http://a", UrlOptions::default().priority(0.8))
            .unwrap();
        sitemap.close().unwrap();

        let content = read(sitemap.path());
        assert!(content.contains("<changefreq>weekly</changefreq><priority>0.8</priority>"));
    }

    #[test]
    fn unknown_option_key_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);
        sitemap.open().unwrap();
        let bytes = sitemap.bytes_written();

        let result = sitemap.write_url_map(
            "http://a",
            options_map(json!({"priority": 0.3, "weight": 7})),
            None,
        );

        match result {
            Err(SitemapError::Encode(EncodeError::UnrecognizedOptions(keys))) => {
                assert_eq!(keys, vec!["weight".to_string()]);
            }
            other => panic!("expected unrecognized options, got {other:?}"),
        }
        assert_eq!(sitemap.bytes_written(), bytes);
        // The rejected call still consumed its slot.
        assert_eq!(sitemap.entries_count(), 1);
    }

    #[test]
    fn option_map_with_known_keys_is_written() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);

        sitemap
            .write_url_map(
                "http://a",
                options_map(json!({"last_modified": "1594771200", "change_frequency": "never"})),
                None,
            )
            .unwrap();
        sitemap.close().unwrap();

        assert!(read(sitemap.path()).contains(
            "<lastmod>2020-07-15</lastmod><changefreq>never</changefreq>"
        ));
    }

    #[test]
    fn invalid_priority_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);
        sitemap.open().unwrap();
        let bytes = sitemap.bytes_written();

        let result = sitemap.write_url("http://a", UrlOptions::default().priority(2.0));
        assert!(matches!(
            result,
            Err(SitemapError::Encode(EncodeError::Validation(_)))
        ));
        assert_eq!(sitemap.bytes_written(), bytes);
        sitemap.close().unwrap();
        assert!(!read(sitemap.path()).contains("<url>"));
    }

    #[test]
    fn image_without_loc_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);
        sitemap.open().unwrap();
        let bytes = sitemap.bytes_written();

        let result = sitemap.write_url(
            "http://a",
            UrlOptions::default().image(ImageEntry::default()),
        );
        assert!(matches!(
            result,
            Err(SitemapError::Encode(EncodeError::MissingField(_)))
        ));
        assert_eq!(sitemap.bytes_written(), bytes);
        sitemap.close().unwrap();
        assert!(!read(sitemap.path()).contains("<url>"));
    }

    #[test]
    fn rejected_first_write_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);

        let result = sitemap.write_url("http://a", UrlOptions::default().priority(-1.0));
        assert!(result.is_err());
        sitemap.close().unwrap();
        assert!(!sitemap.path().exists());
    }

    #[test]
    fn route_is_resolved_through_resolver() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap =
            sitemap_in(&tmp).resolver(BaseUrlResolver::new("http://test.com").unwrap());

        sitemap
            .write_url(
                Route::new("index.php").param("r", "controller/action"),
                UrlOptions::default(),
            )
            .unwrap();
        sitemap.close().unwrap();

        assert!(read(sitemap.path()).contains("http://test.com/index.php?r=controller%2Faction"));
    }

    #[test]
    fn route_without_resolver_fails() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);

        let result = sitemap.write_url(Route::new("site/index"), UrlOptions::default());
        assert!(matches!(result, Err(SitemapError::NoResolver(route)) if route == "site/index"));
    }

    #[test]
    fn images_and_videos_are_namespace_valid() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);

        sitemap
            .write_url(
                "http://a/page",
                UrlOptions::default()
                    .image(ImageEntry::new("http://a/photo.jpg"))
                    .video(crate::encode::VideoEntry {
                        title: Some("Clip <1>".into()),
                        family_friendly: Some(true),
                        ..Default::default()
                    }),
            )
            .unwrap();
        sitemap.close().unwrap();

        assert_well_formed(&read(sitemap.path()));
    }

    #[test]
    fn custom_envelope_is_used() {
        let tmp = TempDir::new().unwrap();
        let envelope = Envelope {
            header: XML_HEADER.to_string(),
            root_tag: Some(RootTag::new("urlset").attribute("xmlns", SITEMAP_NAMESPACE)),
            footer: "<!-- generated -->".into(),
        };
        let mut sitemap =
            SitemapFile::with_envelope(tmp.path().join("s.xml"), envelope, FileOptions::default());

        sitemap.write_url("http://a", UrlOptions::default()).unwrap();
        sitemap.close().unwrap();

        assert!(read(sitemap.path()).ends_with("</urlset><!-- generated -->"));
    }

    #[test]
    fn extra_xml_is_appended_inside_url() {
        let tmp = TempDir::new().unwrap();
        let mut sitemap = sitemap_in(&tmp);

        sitemap
            .write_url_with_xml("http://a", UrlOptions::default(), Some("<note>x</note>"))
            .unwrap();
        sitemap.close().unwrap();

        assert!(read(sitemap.path()).contains("<url><loc>http://a</loc><note>x</note></url>"));
    }
}
