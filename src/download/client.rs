//! HTTP client wrapper for fetching documents.
//!
//! This module provides the `HttpClient` struct which handles streaming
//! downloads to a fixed destination, in-memory fetches for crawled pages,
//! and the shared timeout and redirect configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, MAX_REDIRECTS, PARTIAL_SUFFIX, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Timeout settings for the shared HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Seconds allowed to establish a connection.
    pub connect_timeout_secs: u64,
    /// Seconds allowed for a whole request including the body.
    pub read_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// HTTP client for fetching documents with streaming support.
///
/// Created once per run and cloned into every fetch task; clones share the
/// underlying connection pool.
///
/// # Example
///
/// ```no_run
/// use specfetch_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let file = client
///     .download_to_path("https://example.com/elf.pdf", Path::new("./elf.pdf"))
///     .await?;
/// println!("Wrote {} bytes", file.bytes);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Final destination path.
    pub path: PathBuf,
    /// Number of body bytes written.
    pub bytes: u64,
}

/// A resource fetched fully into memory.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// URL after redirects.
    pub final_url: Url,
    /// Value of the Content-Type header, lowercased, if present.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl FetchedResource {
    /// Returns true when the resource is an HTML page.
    #[must_use]
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.contains("text/html") || ct.contains("application/xhtml"),
            None => {
                let path = self.final_url.path().to_ascii_lowercase();
                path.ends_with(".html") || path.ends_with(".htm") || path.ends_with('/')
            }
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_settings(HttpSettings::default())
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the TLS backend or the builder
    /// configuration cannot be initialized.
    pub fn with_settings(settings: HttpSettings) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.read_timeout_secs))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(DownloadError::Client)?;
        Ok(Self { client })
    }

    /// Downloads `url` and writes the body to `dest`, replacing any existing file.
    ///
    /// The body is streamed into `<dest>.part` first and renamed into place
    /// only after the last chunk is flushed, so a failed fetch never
    /// clobbers the output of a previous run. Parent directories are created
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - Writing to disk fails
    #[must_use = "download result contains the path and size of the written file"]
    #[instrument(skip(self), fields(url = %url, dest = %dest.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        dest: &Path,
    ) -> Result<DownloadedFile, DownloadError> {
        self.download_with_headers(url, dest, HeaderMap::new()).await
    }

    /// Same as [`download_to_path`](Self::download_to_path) with extra request headers.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`download_to_path`](Self::download_to_path).
    pub async fn download_with_headers(
        &self,
        url: &str,
        dest: &Path,
        headers: HeaderMap,
    ) -> Result<DownloadedFile, DownloadError> {
        debug!("starting download");
        let parsed = parse_http_url(url)?;

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::write(parent, e))?;
        }

        let response = self.send(parsed, headers).await?;
        let partial = partial_path(dest);

        let mut file = File::create(&partial)
            .await
            .map_err(|e| DownloadError::write(partial.clone(), e))?;

        let stream_result = stream_to_file(&mut file, response, url, &partial).await;
        drop(file);

        let bytes = match stream_result {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %partial.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial, dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(DownloadError::write(dest, e));
        }

        info!(path = %dest.display(), bytes, "download complete");

        Ok(DownloadedFile {
            path: dest.to_path_buf(),
            bytes,
        })
    }

    /// Fetches `url` fully into memory.
    ///
    /// Used for crawled HTML pages and their small companion resources.
    ///
    /// # Errors
    ///
    /// Returns the same request errors as [`download_to_path`](Self::download_to_path).
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<FetchedResource, DownloadError> {
        let response = self.send(url.clone(), HeaderMap::new()).await?;
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);
        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::from_transport(url.as_str(), e))?
            .to_vec();

        Ok(FetchedResource {
            final_url,
            content_type,
            body,
        })
    }

    /// Sends a GET with `headers` and returns the successful response.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Status`] for non-2xx statuses and
    /// transport errors otherwise.
    pub async fn get(&self, url: &str, headers: HeaderMap) -> Result<Response, DownloadError> {
        let parsed = parse_http_url(url)?;
        self.send(parsed, headers).await
    }

    async fn send(&self, url: Url, headers: HeaderMap) -> Result<Response, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| DownloadError::from_transport(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::status(url.as_str(), status.as_u16()));
        }

        Ok(response)
    }
}

fn parse_http_url(url: &str) -> Result<Url, DownloadError> {
    let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DownloadError::invalid_url(url));
    }
    Ok(parsed)
}

/// Returns the sibling `.part` path used while streaming into `dest`.
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_transport(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::write(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::write(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
