//! GitHub release asset downloads.
//!
//! Queries the REST API for a repository's latest release, selects assets by
//! glob, and downloads each into a destination directory, overwriting files
//! of the same name.
//!
//! # Example
//!
//! ```no_run
//! use specfetch_core::download::HttpClient;
//! use specfetch_core::github::ReleaseClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let releases = ReleaseClient::new(HttpClient::new());
//! let files = releases
//!     .download_latest_assets("ARM-software/abi-aa", "aaelf64*.pdf", Path::new("."))
//!     .await?;
//! println!("{} assets", files.len());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use glob::Pattern;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::download::{DownloadError, DownloadedFile, HttpClient};
use crate::manifest::split_repo;

/// Public GitHub REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const API_MEDIA_TYPE: &str = "application/vnd.github+json";
const ASSET_MEDIA_TYPE: &str = "application/octet-stream";

/// Errors raised while fetching release assets.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Repository is not in `owner/name` form.
    #[error("invalid GitHub repository '{repo}' (expected owner/name)")]
    InvalidRepo {
        /// The rejected identifier.
        repo: String,
    },

    /// Asset glob does not compile.
    #[error("invalid asset pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// The glob parse error.
        #[source]
        source: glob::PatternError,
    },

    /// The configured token cannot be sent as a header.
    #[error("GITHUB_TOKEN contains characters that are not valid in an HTTP header")]
    InvalidToken,

    /// The releases API request failed.
    #[error("GitHub API request for {repo} failed: {source}")]
    Api {
        /// The repository.
        repo: String,
        /// The request error.
        #[source]
        source: DownloadError,
    },

    /// The releases API returned an unexpected body.
    #[error("unexpected GitHub API response for {repo}: {source}")]
    Decode {
        /// The repository.
        repo: String,
        /// The decode error.
        #[source]
        source: reqwest::Error,
    },

    /// The latest release has no asset matching the pattern.
    #[error("release {tag} of {repo} has no asset matching '{pattern}' (assets: {available})")]
    NoMatchingAssets {
        /// The repository.
        repo: String,
        /// Release tag.
        tag: String,
        /// The pattern that matched nothing.
        pattern: String,
        /// Comma-separated asset names present.
        available: String,
    },

    /// Downloading one asset failed.
    #[error("failed to download asset {name}: {source}")]
    Asset {
        /// Asset file name.
        name: String,
        /// The download error.
        #[source]
        source: DownloadError,
    },
}

/// A release as returned by `GET /repos/{owner}/{repo}/releases/latest`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    /// Git tag of the release.
    pub tag_name: String,
    /// Display name, when set.
    #[serde(default)]
    pub name: Option<String>,
    /// Attached files.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A file attached to a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// File name.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
    /// Size in bytes as reported by the API.
    #[serde(default)]
    pub size: u64,
}

/// Client for the GitHub releases API.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: HttpClient,
    api_base: String,
    token: Option<String>,
}

impl ReleaseClient {
    /// Creates a client against the public API without authentication.
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
        }
    }

    /// Overrides the API base URL (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets a bearer token for API requests; raises the anonymous rate limit.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// The API base URL in use.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Fetches the latest published release of `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidRepo`], [`ReleaseError::Api`], or
    /// [`ReleaseError::Decode`].
    #[instrument(skip(self))]
    pub async fn latest_release(&self, repo: &str) -> Result<Release, ReleaseError> {
        let (owner, name) = split_repo(repo).ok_or_else(|| ReleaseError::InvalidRepo {
            repo: repo.to_string(),
        })?;
        let url = format!("{}/repos/{owner}/{name}/releases/latest", self.api_base);

        let response = self
            .http
            .get(&url, self.api_headers()?)
            .await
            .map_err(|source| ReleaseError::Api {
                repo: repo.to_string(),
                source,
            })?;

        let release: Release = response.json().await.map_err(|source| ReleaseError::Decode {
            repo: repo.to_string(),
            source,
        })?;

        debug!(tag = %release.tag_name, assets = release.assets.len(), "fetched latest release");
        Ok(release)
    }

    /// Downloads every asset of the latest release whose name matches `pattern`
    /// into `dest_dir`, replacing existing files of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::NoMatchingAssets`] when nothing matches, and the
    /// first download failure otherwise.
    #[instrument(skip(self), fields(dest_dir = %dest_dir.display()))]
    pub async fn download_latest_assets(
        &self,
        repo: &str,
        pattern: &str,
        dest_dir: &Path,
    ) -> Result<Vec<DownloadedFile>, ReleaseError> {
        let glob = Pattern::new(pattern).map_err(|source| ReleaseError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let release = self.latest_release(repo).await?;
        let selected = select_assets(&release, &glob);

        if selected.is_empty() {
            return Err(ReleaseError::NoMatchingAssets {
                repo: repo.to_string(),
                tag: release.tag_name.clone(),
                pattern: pattern.to_string(),
                available: release
                    .assets
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let mut files = Vec::with_capacity(selected.len());
        for asset in selected {
            let dest = dest_dir.join(&asset.name);
            let mut headers = HeaderMap::new();
            headers.insert(ACCEPT, HeaderValue::from_static(ASSET_MEDIA_TYPE));
            let file = self
                .http
                .download_with_headers(&asset.browser_download_url, &dest, headers)
                .await
                .map_err(|source| ReleaseError::Asset {
                    name: asset.name.clone(),
                    source,
                })?;
            info!(asset = %asset.name, tag = %release.tag_name, bytes = file.bytes, "release asset saved");
            files.push(file);
        }

        Ok(files)
    }

    fn api_headers(&self) -> Result<HeaderMap, ReleaseError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_MEDIA_TYPE));
        headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| ReleaseError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

/// Assets whose name matches `pattern`, in API order.
///
/// Names that would escape the destination directory are skipped.
#[must_use]
pub fn select_assets<'a>(release: &'a Release, pattern: &Pattern) -> Vec<&'a ReleaseAsset> {
    release
        .assets
        .iter()
        .filter(|asset| pattern.matches(&asset.name))
        .filter(|asset| {
            let safe = is_plain_file_name(&asset.name);
            if !safe {
                warn!(asset = %asset.name, "skipping asset with unsafe file name");
            }
            safe
        })
        .collect()
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
