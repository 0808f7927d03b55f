//! Crawl boundary and local path mapping.

use std::path::{Path, PathBuf};

use url::Url;

/// File name used for URLs that name a directory.
const INDEX_FILE: &str = "index.html";

/// The part of a site a mirror may visit: one origin, one directory prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope {
    scheme: String,
    host: String,
    port: Option<u16>,
    prefix: String,
}

impl CrawlScope {
    /// Scope for `root`: its origin and the directory containing it.
    ///
    /// Returns `None` for URLs without a host or with a non-HTTP scheme.
    #[must_use]
    pub fn for_root(root: &Url) -> Option<Self> {
        if !matches!(root.scheme(), "http" | "https") {
            return None;
        }
        let host = root.host_str()?.to_ascii_lowercase();
        let path = root.path();
        let prefix = match path.rfind('/') {
            Some(idx) => path[..=idx].to_string(),
            None => "/".to_string(),
        };
        Some(Self {
            scheme: root.scheme().to_string(),
            host,
            port: root.port_or_known_default(),
            prefix,
        })
    }

    /// Directory prefix every crawled path must start with.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `url` lies inside this scope.
    #[must_use]
    pub fn contains(&self, url: &Url) -> bool {
        url.scheme() == self.scheme
            && url
                .host_str()
                .is_some_and(|h| h.eq_ignore_ascii_case(&self.host))
            && url.port_or_known_default() == self.port
            && url.path().starts_with(&self.prefix)
    }

    /// Local file for `url` under `dest`, preserving the layout below the prefix.
    ///
    /// Directory URLs map to `index.html`. Returns `None` when `url` is out
    /// of scope or a decoded segment would escape `dest`.
    #[must_use]
    pub fn local_path(&self, url: &Url, dest: &Path) -> Option<PathBuf> {
        if !self.contains(url) {
            return None;
        }
        let relative = &url.path()[self.prefix.len()..];

        let mut path = dest.to_path_buf();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            let decoded = urlencoding::decode(segment).ok()?;
            if decoded == "." || decoded == ".." || decoded.contains(['/', '\\']) {
                return None;
            }
            path.push(decoded.as_ref());
        }

        if relative.is_empty() || relative.ends_with('/') {
            path.push(INDEX_FILE);
        }
        Some(path)
    }
}

/// Drops the fragment and query so each document is fetched once.
pub(crate) fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url.set_query(None);
    url
}
