//! Error type for a single entry's fetch.

use std::path::PathBuf;

use thiserror::Error;

use crate::convert::ConvertError;
use crate::download::DownloadError;
use crate::github::ReleaseError;
use crate::mirror::MirrorError;
use crate::tools::ToolError;
use crate::vcs::VcsError;

/// Why an entry failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Plain download failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Release lookup or asset download failed.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// HTML mirror failed.
    #[error(transparent)]
    Mirror(#[from] MirrorError),

    /// PDF conversion or concatenation failed.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Clone or pull failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// The build tool failed.
    #[error("build failed: {0}")]
    Build(#[source] ToolError),

    /// The build succeeded but the expected artifact is absent.
    #[error("build finished but {path} was not produced")]
    MissingArtifact {
        /// Expected artifact location.
        path: PathBuf,
    },

    /// Placing the result failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The task running the entry panicked or was cancelled.
    #[error("entry task ended abnormally: {0}")]
    Task(String),
}

impl FetchError {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
