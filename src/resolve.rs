//! Turning route specifications into absolute URLs.
//!
//! The sitemap writer accepts either a ready URL string or a [`Route`]. Routes
//! are opaque to the writer: they are handed to a [`UrlResolver`], which owns
//! whatever routing rules the surrounding application has. [`BaseUrlResolver`]
//! is the stock implementation: it joins the route path onto a site URL and
//! appends the parameters as a query string.
//!
//! ```text
//! base  https://example.com/blog
//! route { path: "posts/view", params: [("id", "7")] }
//!   →   https://example.com/blog/posts/view?id=7
//! ```

use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unable to resolve route '{0}'")]
    Unresolvable(String),
}

/// A structured route: a path plus ordered parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Where a sitemap entry points: an absolute URL, or a route still to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(String),
    Route(Route),
}

impl From<&str> for Location {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for Location {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<Route> for Location {
    fn from(route: Route) -> Self {
        Self::Route(route)
    }
}

/// Produces an absolute URL for a route.
pub trait UrlResolver {
    fn resolve(&self, route: &Route) -> Result<String, ResolveError>;
}

impl<F> UrlResolver for F
where
    F: Fn(&Route) -> Result<String, ResolveError>,
{
    fn resolve(&self, route: &Route) -> Result<String, ResolveError> {
        self(route)
    }
}

/// Resolves routes relative to a fixed site URL.
#[derive(Debug, Clone)]
pub struct BaseUrlResolver {
    base: Url,
}

impl BaseUrlResolver {
    pub fn new(base_url: &str) -> Result<Self, ResolveError> {
        let mut base = Url::parse(base_url)?;
        // Url::join drops the last segment unless the path ends in a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl UrlResolver for BaseUrlResolver {
    fn resolve(&self, route: &Route) -> Result<String, ResolveError> {
        let mut url = self.base.join(route.path.trim_start_matches('/'))?;
        if !route.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &route.params {
                query.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }
}
