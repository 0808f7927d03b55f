//! Recursive retrieval of an HTML page tree.
//!
//! Starting from a root page, the crawler follows `a[href]`, `link[href]` and
//! `img[src]` references breadth-first, staying on the root's origin and
//! below the directory that contains the root page. Every fetched resource
//! is written under a local directory mirroring the remote layout, so
//! relative links keep working for the HTML-to-PDF converter. A redirected
//! page is saved and parsed under the URL it was finally served from.
//!
//! HTML pages are numbered in the order they are discovered. That sequence
//! number, not the file's modification time, defines document order.

mod links;
mod scope;

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::download::{DownloadError, HttpClient};

pub use links::extract_links;
pub use scope::CrawlScope;

/// Default cap on the number of HTML pages mirrored per book.
pub const DEFAULT_MAX_PAGES: usize = 512;

/// Errors that abort a mirror. Failures of individual non-root resources are
/// collected in [`MirrorReport::failures`] instead.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The root URL cannot be crawled.
    #[error("invalid mirror root {url}")]
    InvalidRoot {
        /// The rejected URL.
        url: String,
    },

    /// The root page could not be fetched.
    #[error("failed to fetch mirror root: {source}")]
    Root {
        /// The fetch error.
        #[source]
        source: DownloadError,
    },

    /// The root URL did not serve HTML.
    #[error("mirror root {url} is not an HTML page")]
    RootNotHtml {
        /// The root URL.
        url: String,
    },

    /// Writing the local tree failed.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The local path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// One mirrored HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredPage {
    /// Discovery order, starting at 0 for the root.
    pub sequence: usize,
    /// Remote URL.
    pub url: Url,
    /// Local copy.
    pub path: PathBuf,
}

/// Outcome of a completed mirror.
#[derive(Debug, Clone, Default)]
pub struct MirrorReport {
    /// HTML pages in sequence order.
    pub pages: Vec<MirroredPage>,
    /// Number of non-HTML resources saved.
    pub resources: usize,
    /// Resources that could not be fetched or saved, with the reason.
    pub failures: Vec<(Url, String)>,
    /// Whether the page cap stopped the crawl early.
    pub truncated: bool,
}

/// Breadth-first crawler bounded to one directory of one origin.
#[derive(Debug, Clone, Copy)]
pub struct Mirror<'a> {
    client: &'a HttpClient,
    max_pages: usize,
}

impl<'a> Mirror<'a> {
    /// Creates a crawler with the default page cap.
    #[must_use]
    pub fn new(client: &'a HttpClient) -> Self {
        Self {
            client,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Sets the maximum number of HTML pages to mirror (at least 1).
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Mirrors the tree rooted at `root` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] if the root cannot be fetched or is not HTML,
    /// or if the local tree cannot be written.
    #[instrument(skip(self), fields(root = %root, dest = %dest.display()))]
    pub async fn mirror(&self, root: &Url, dest: &Path) -> Result<MirrorReport, MirrorError> {
        let mut scope = CrawlScope::for_root(root).ok_or_else(|| MirrorError::InvalidRoot {
            url: root.to_string(),
        })?;
        let root = scope::normalize(root.clone());

        let mut report = MirrorReport::default();
        let mut seen: HashSet<String> = HashSet::from([root.to_string()]);
        let mut queue: VecDeque<Url> = VecDeque::from([root.clone()]);

        while let Some(url) = queue.pop_front() {
            let is_root = url == root;

            let resource = match self.client.fetch(&url).await {
                Ok(resource) => resource,
                Err(source) if is_root => return Err(MirrorError::Root { source }),
                Err(e) => {
                    warn!(url = %url, error = %e, "skipping resource that failed to download");
                    report.failures.push((url, e.to_string()));
                    continue;
                }
            };

            let is_html = resource.is_html();
            if is_root && !is_html {
                return Err(MirrorError::RootNotHtml {
                    url: url.to_string(),
                });
            }

            // Relative links and the local layout follow the URL that answered.
            let page_url = scope::normalize(resource.final_url.clone());
            if is_root {
                if let Some(redirected) = CrawlScope::for_root(&page_url) {
                    scope = redirected;
                }
                seen.insert(page_url.to_string());
            } else if page_url != url {
                if !scope.contains(&page_url) {
                    debug!(url = %url, target = %page_url, "redirected out of scope, skipping");
                    continue;
                }
                if !seen.insert(page_url.to_string()) {
                    debug!(url = %url, target = %page_url, "redirect target already queued");
                    continue;
                }
            }

            let Some(local) = scope.local_path(&page_url, dest) else {
                debug!(url = %page_url, "no safe local path, skipping");
                continue;
            };
            match write_file(&local, &resource.body).await {
                Ok(()) => {}
                Err(e) if is_root => return Err(e),
                Err(e) => {
                    warn!(url = %page_url, error = %e, "skipping resource that could not be saved");
                    report.failures.push((page_url, e.to_string()));
                    continue;
                }
            }

            if !is_html {
                report.resources += 1;
                continue;
            }

            let sequence = report.pages.len();
            debug!(sequence, url = %page_url, path = %local.display(), "mirrored page");
            report.pages.push(MirroredPage {
                sequence,
                url: page_url.clone(),
                path: local,
            });

            if report.pages.len() >= self.max_pages {
                if !queue.is_empty() {
                    warn!(max_pages = self.max_pages, "page cap reached, stopping crawl");
                    report.truncated = true;
                }
                break;
            }

            let html = String::from_utf8_lossy(&resource.body);
            for link in extract_links(&html, &page_url) {
                let link = scope::normalize(link);
                if scope.contains(&link) && seen.insert(link.to_string()) {
                    queue.push_back(link);
                }
            }
        }

        info!(
            pages = report.pages.len(),
            resources = report.resources,
            failures = report.failures.len(),
            "mirror complete"
        );
        Ok(report)
    }
}

async fn write_file(path: &Path, body: &[u8]) -> Result<(), MirrorError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| MirrorError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|source| MirrorError::Io {
            path: path.to_path_buf(),
            source,
        })
}
