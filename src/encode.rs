//! XML fragment encoding for sitemap entries.
//!
//! Every function here is pure: it takes entry data and returns the XML text
//! for one entry. Nothing touches the filesystem, so a fragment is complete
//! before a single byte reaches the output file. A validation failure can
//! never leave half an entry on disk.
//!
//! ## Fragment Layout
//!
//! ```text
//! <url>
//!   <loc>…</loc>
//!   <lastmod>…</lastmod>          optional
//!   <changefreq>…</changefreq>    optional
//!   <priority>…</priority>        optional
//!   <image:image>…</image:image>  zero or more
//!   <video:video>…</video:video>  zero or more
//!   …caller-supplied raw XML…     optional
//! </url>
//! ```
//!
//! Output is written without whitespace between elements. Unset fields are
//! omitted entirely; defaulting is the caller's business and happens before
//! encoding (see [`UrlOptions::merged_over`]).
//!
//! ## Dates
//!
//! `lastmod` and the video date fields accept either a Unix timestamp or a
//! string. Timestamps, including strings made only of digits, are rendered as
//! `YYYY-MM-DD` in UTC. Any other string is passed through untouched, so a
//! caller can supply full W3C datetimes.

use chrono::{DateTime, NaiveDate};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Unrecognized options: {}", .0.join(", "))]
    UnrecognizedOptions(Vec<String>),
    #[error("Invalid option value: {0}")]
    InvalidValue(#[from] serde_json::Error),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// How often a page is expected to change (`<changefreq>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A modification date as supplied by the caller.
///
/// - `Timestamp(1594771200)` → `2020-07-15`
/// - `Text("1594771200")` → `2020-07-15` (digit-only strings are timestamps)
/// - `Text("2020-07-15")` → `2020-07-15`
/// - `Text("2020-07-15T10:00:00+00:00")` → passed through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastModified {
    Timestamp(i64),
    Text(String),
}

impl From<i64> for LastModified {
    fn from(secs: i64) -> Self {
        Self::Timestamp(secs)
    }
}

impl From<&str> for LastModified {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for LastModified {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<NaiveDate> for LastModified {
    fn from(date: NaiveDate) -> Self {
        Self::Text(date.format("%Y-%m-%d").to_string())
    }
}

/// Render a [`LastModified`] the way it appears inside `<lastmod>`.
pub fn normalize_date(value: &LastModified) -> String {
    match value {
        LastModified::Timestamp(secs) => format_timestamp(*secs),
        LastModified::Text(text) if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => {
            match text.parse::<i64>() {
                Ok(secs) => format_timestamp(secs),
                Err(_) => text.clone(),
            }
        }
        LastModified::Text(text) => text.clone(),
    }
}

fn format_timestamp(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => secs.to_string(),
    }
}

/// Per-URL metadata accepted by the sitemap writer.
///
/// Keys in an untyped option map use the field names (`last_modified`,
/// `change_frequency`, `priority`, `images`, `videos`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<LastModified>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_frequency: Option<ChangeFrequency>,
    /// Relative priority in `0.0..=1.0`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<VideoEntry>,
}

impl UrlOptions {
    /// Option keys recognized in an untyped option map.
    pub const KEYS: &'static [&'static str] = &[
        "last_modified",
        "change_frequency",
        "priority",
        "images",
        "videos",
    ];

    /// Build options from an untyped key/value map.
    ///
    /// Every unknown top-level key is reported at once, even when valid keys
    /// are present alongside it.
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, EncodeError> {
        let unknown: Vec<String> = map
            .keys()
            .filter(|key| !Self::KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(EncodeError::UnrecognizedOptions(unknown));
        }
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }

    pub fn last_modified(mut self, value: impl Into<LastModified>) -> Self {
        self.last_modified = Some(value.into());
        self
    }

    pub fn change_frequency(mut self, value: ChangeFrequency) -> Self {
        self.change_frequency = Some(value);
        self
    }

    pub fn priority(mut self, value: f64) -> Self {
        self.priority = Some(value);
        self
    }

    pub fn image(mut self, image: ImageEntry) -> Self {
        self.images.push(image);
        self
    }

    pub fn video(mut self, video: VideoEntry) -> Self {
        self.videos.push(video);
        self
    }

    /// Fill unset fields from `defaults`. Fields set here always win; an
    /// empty image or video list takes the default list.
    pub fn merged_over(self, defaults: &UrlOptions) -> UrlOptions {
        UrlOptions {
            last_modified: self.last_modified.or_else(|| defaults.last_modified.clone()),
            change_frequency: self.change_frequency.or(defaults.change_frequency),
            priority: self.priority.or(defaults.priority),
            images: if self.images.is_empty() {
                defaults.images.clone()
            } else {
                self.images
            },
            videos: if self.videos.is_empty() {
                defaults.videos.clone()
            } else {
                self.videos
            },
        }
    }

    pub fn validate(&self) -> Result<(), EncodeError> {
        match self.priority {
            Some(priority) if !(0.0..=1.0).contains(&priority) => Err(EncodeError::Validation(
                format!("priority must be within 0.0-1.0, got {priority}"),
            )),
            _ => Ok(()),
        }
    }
}

/// An `<image:image>` attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageEntry {
    /// Required. Left empty only when deserialized without it, which
    /// encoding rejects.
    #[serde(default)]
    pub loc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl ImageEntry {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            ..Self::default()
        }
    }
}

/// A `<video:video>` attachment. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_loc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_loc: Option<String>,
    /// Length in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<LastModified>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<LastModified>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_friendly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_subscription: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<VideoPlayer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restriction: Option<VideoRestriction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery: Option<VideoGallery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<VideoPrice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<VideoUploader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoPlayer {
    pub loc: String,
    #[serde(default = "default_allow_embed")]
    pub allow_embed: bool,
    /// Rendered as the `autoplay` attribute when non-empty (e.g. `"ap=1"`).
    #[serde(default)]
    pub autoplay: String,
}

fn default_allow_embed() -> bool {
    true
}

/// Country restriction; `relationship` is `allow` or `deny`, `value` a
/// space-separated list of country codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoRestriction {
    pub relationship: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoGallery {
    pub title: String,
    pub loc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoPrice {
    pub currency: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoUploader {
    pub info: String,
    pub name: String,
}

// ============================================================================
// Element helpers
// ============================================================================

/// Render an opening tag with attributes in the given order.
pub fn start_tag(name: &str, attributes: &[(String, String)]) -> String {
    let mut tag = format!("<{name}");
    for (key, value) in attributes {
        tag.push_str(&format!(" {key}=\"{}\"", escape(value.as_str())));
    }
    tag.push('>');
    tag
}

pub fn end_tag(name: &str) -> String {
    format!("</{name}>")
}

fn push_element(out: &mut String, name: &str, text: &str) {
    out.push_str(&format!("<{name}>{}</{name}>", escape(text)));
}

fn push_optional(out: &mut String, name: &str, text: Option<&str>) {
    if let Some(text) = text {
        push_element(out, name, text);
    }
}

fn push_cdata(out: &mut String, name: &str, text: &str) {
    // `]]>` cannot appear inside a CDATA section; split it across two.
    let text = text.replace("]]>", "]]]]><![CDATA[>");
    out.push_str(&format!("<{name}><![CDATA[{text}]]></{name}>"));
}

fn push_with_attribute(out: &mut String, name: &str, attributes: &[(&str, &str)], text: &str) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        out.push_str(&format!(" {key}=\"{}\"", escape(*value)));
    }
    out.push_str(&format!(">{}</{name}>", escape(text)));
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// `0.2` → `"0.2"`, `1.0` → `"1.0"`.
fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

// ============================================================================
// Entry encoders
// ============================================================================

/// Encode one `<url>` block.
///
/// `options` must already have defaults applied; nothing is filled in here.
/// An empty `loc` fails with [`EncodeError::MissingField`].
pub fn encode_url(
    loc: &str,
    options: &UrlOptions,
    extra_xml: Option<&str>,
) -> Result<String, EncodeError> {
    if loc.is_empty() {
        return Err(EncodeError::MissingField("loc"));
    }
    let mut xml = String::from("<url>");
    push_element(&mut xml, "loc", loc);
    if let Some(last_modified) = &options.last_modified {
        push_element(&mut xml, "lastmod", &normalize_date(last_modified));
    }
    if let Some(change_frequency) = options.change_frequency {
        push_element(&mut xml, "changefreq", change_frequency.as_str());
    }
    if let Some(priority) = options.priority {
        push_element(&mut xml, "priority", &format_decimal(priority));
    }
    for image in &options.images {
        xml.push_str(&encode_image(image)?);
    }
    for video in &options.videos {
        xml.push_str(&encode_video(video));
    }
    if let Some(extra) = extra_xml {
        xml.push_str(extra);
    }
    xml.push_str("</url>");
    Ok(xml)
}

pub fn encode_image(image: &ImageEntry) -> Result<String, EncodeError> {
    if image.loc.is_empty() {
        return Err(EncodeError::MissingField("image:loc"));
    }
    let mut xml = String::from("<image:image>");
    push_element(&mut xml, "image:loc", &image.loc);
    push_optional(&mut xml, "image:title", image.title.as_deref());
    push_optional(&mut xml, "image:caption", image.caption.as_deref());
    push_optional(&mut xml, "image:geo_location", image.geo_location.as_deref());
    push_optional(&mut xml, "image:license", image.license.as_deref());
    xml.push_str("</image:image>");
    Ok(xml)
}

pub fn encode_video(video: &VideoEntry) -> String {
    let mut xml = String::from("<video:video>");
    push_optional(&mut xml, "video:thumbnail_loc", video.thumbnail_loc.as_deref());
    if let Some(title) = &video.title {
        push_cdata(&mut xml, "video:title", title);
    }
    if let Some(description) = &video.description {
        push_cdata(&mut xml, "video:description", description);
    }
    push_optional(&mut xml, "video:content_loc", video.content_loc.as_deref());
    if let Some(duration) = video.duration {
        push_element(&mut xml, "video:duration", &duration.to_string());
    }
    if let Some(date) = &video.expiration_date {
        push_element(&mut xml, "video:expiration_date", &normalize_date(date));
    }
    if let Some(rating) = video.rating {
        push_element(&mut xml, "video:rating", &format_decimal(rating));
    }
    if let Some(views) = video.view_count {
        push_element(&mut xml, "video:view_count", &views.to_string());
    }
    if let Some(date) = &video.publication_date {
        push_element(&mut xml, "video:publication_date", &normalize_date(date));
    }
    if let Some(flag) = video.family_friendly {
        push_element(&mut xml, "video:family_friendly", yes_no(flag));
    }
    if let Some(flag) = video.requires_subscription {
        push_element(&mut xml, "video:requires_subscription", yes_no(flag));
    }
    if let Some(flag) = video.live {
        push_element(&mut xml, "video:live", yes_no(flag));
    }
    if let Some(player) = &video.player {
        let mut attributes = vec![("allow_embed", yes_no(player.allow_embed))];
        if !player.autoplay.is_empty() {
            attributes.push(("autoplay", player.autoplay.as_str()));
        }
        push_with_attribute(&mut xml, "video:player_loc", &attributes, &player.loc);
    }
    if let Some(restriction) = &video.restriction {
        push_with_attribute(
            &mut xml,
            "video:restriction",
            &[("relationship", restriction.relationship.as_str())],
            &restriction.value,
        );
    }
    if let Some(gallery) = &video.gallery {
        push_with_attribute(
            &mut xml,
            "video:gallery_loc",
            &[("title", gallery.title.as_str())],
            &gallery.loc,
        );
    }
    if let Some(price) = &video.price {
        push_with_attribute(
            &mut xml,
            "video:price",
            &[("currency", price.currency.as_str())],
            &price.amount,
        );
    }
    if let Some(uploader) = &video.uploader {
        push_with_attribute(
            &mut xml,
            "video:uploader",
            &[("info", uploader.info.as_str())],
            &uploader.name,
        );
    }
    xml.push_str("</video:video>");
    xml
}

/// Encode one `<sitemap>` block for an index file.
pub fn encode_index_entry(loc: &str, last_modified: Option<&LastModified>) -> String {
    let mut xml = String::from("<sitemap>");
    push_element(&mut xml, "loc", loc);
    if let Some(last_modified) = last_modified {
        push_element(&mut xml, "lastmod", &normalize_date(last_modified));
    }
    xml.push_str("</sitemap>");
    xml
}
