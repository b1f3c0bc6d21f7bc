//! # Simple Sitemap
//!
//! Writes [sitemaps.org](https://www.sitemaps.org/protocol.html) XML sitemaps
//! and sitemap index files, streaming entries straight to disk while keeping
//! each file inside the protocol's entry-count and byte-size limits.
//!
//! # Architecture
//!
//! ```text
//! caller ──▶ SitemapFile / IndexFile ──▶ encode (fragment) ──▶ XmlFile ──▶ file
//! ```
//!
//! Data flows one way. Each entry is encoded completely in memory before the
//! writer sees it, and the writer is the only thing that touches the file.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`writer`] | Bounded streaming writer: envelope, open/write/close lifecycle, entry and size limits |
//! | [`encode`] | Pure XML fragment encoders for `<url>`, `<image:image>`, `<video:video>`, `<sitemap>` |
//! | [`sitemap`] | URL sitemap files (`<urlset>`) |
//! | [`index`] | Sitemap index files (`<sitemapindex>`), including directory discovery |
//! | [`resolve`] | Route → absolute URL resolution |
//! | [`config`] | `sitemap.toml` loading, validation and merging |
//! | [`generate`] | JSON Lines entry list → sitemaps with rollover + index |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Writer, Two Envelopes
//!
//! Sitemaps and indexes differ only in their root tag and entry format. Both
//! wrap the same [`writer::XmlFile`], configured with an
//! [`writer::Envelope`]; there is no trait hierarchy to extend.
//!
//! ## Explicit Lifecycle
//!
//! A file is `Closed` or `Open`. [`writer::XmlFile::open`] is the only
//! transition into `Open`; writes go through it, so the first write creates
//! the file. `Drop` closes anything still open, so a file is never left
//! without its closing tag.
//!
//! ## Limits
//!
//! The entry limit is checked before an entry is encoded, so an over-limit
//! entry never reaches disk. The byte limit is checked after closing by
//! default, matching what the file actually contains; a stricter per-write
//! check is available through [`writer::SizeCheck::OnWrite`].

pub mod config;
pub mod encode;
pub mod generate;
pub mod index;
pub mod output;
pub mod resolve;
pub mod sitemap;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
