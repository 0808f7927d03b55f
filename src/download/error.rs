//! Errors raised by [`HttpClient`](super::HttpClient).

use std::path::PathBuf;

use thiserror::Error;

/// A failed HTTP fetch. Every variant names the URL or local path involved,
/// since entry reports show these messages as-is.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HTTP client itself could not be built.
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS or body transfer failure.
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },

    /// No response within the configured timeout.
    #[error("timed out fetching {url}")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// Writing the response body to disk failed.
    #[error("cannot write {path}: {source}")]
    Write {
        /// Local file being written.
        path: PathBuf,
        /// IO error.
        #[source]
        source: std::io::Error,
    },

    /// The URL does not parse or is not http(s).
    #[error("not an http(s) URL: {url}")]
    InvalidUrl {
        /// The rejected text.
        url: String,
    },
}

impl DownloadError {
    pub(crate) fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Maps a reqwest transport error, separating timeouts from other failures.
    pub(crate) fn from_transport(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_names_code_and_url() {
        let msg = DownloadError::status("https://refspecs.example/elf.pdf", 404).to_string();
        assert_eq!(msg, "HTTP 404 from https://refspecs.example/elf.pdf");
    }

    #[test]
    fn test_write_message_names_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let msg = DownloadError::write("/srv/abi/elf.pdf", source).to_string();
        assert!(msg.starts_with("cannot write /srv/abi/elf.pdf"), "{msg}");
    }

    #[test]
    fn test_invalid_url_message() {
        let msg = DownloadError::invalid_url("ftp://old.example/abi.ps").to_string();
        assert_eq!(msg, "not an http(s) URL: ftp://old.example/abi.ps");
    }
}
