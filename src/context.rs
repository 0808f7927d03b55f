//! Run context: the resolved output directory and the scratch directory.
//!
//! Every fetch operation receives a [`FetchContext`] instead of reading the
//! process working directory. The scratch directory is either an ephemeral
//! temp dir, removed when the context is dropped on any exit path, or a
//! caller-provided directory that survives the run so clones can be reused.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::download::constants::PARTIAL_SUFFIX;
use crate::download::partial_path;
use crate::manifest::{Manifest, ManifestEntry, Source};

/// Prefix for ephemeral scratch directories.
const SCRATCH_PREFIX: &str = "specfetch-";

/// Errors raised while preparing the run environment. These are fatal.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// The output directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The scratch directory could not be created or removed.
    #[error("scratch directory error at {path}: {source}")]
    Scratch {
        /// The scratch directory (or its intended parent).
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The running executable's location could not be determined.
    #[error("cannot determine the executable location: {source}")]
    ExecutableLocation {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Scratch space for intermediate artifacts of a single run.
#[derive(Debug)]
pub enum ScratchDir {
    /// Removed when dropped.
    Ephemeral(TempDir),
    /// Kept after the run.
    Persistent(PathBuf),
}

impl ScratchDir {
    /// Creates a fresh temp directory under the system temp location.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Scratch`] if the directory cannot be created.
    pub fn ephemeral() -> Result<Self, ContextError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(|source| ContextError::Scratch {
                path: std::env::temp_dir(),
                source,
            })?;
        debug!(path = %dir.path().display(), "created ephemeral scratch directory");
        Ok(Self::Ephemeral(dir))
    }

    /// Uses `path` as scratch space, creating it if needed. It is not removed afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Scratch`] if the directory cannot be created.
    pub fn persistent(path: impl Into<PathBuf>) -> Result<Self, ContextError> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|source| ContextError::Scratch {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "using persistent work directory");
        Ok(Self::Persistent(path))
    }

    /// The scratch root.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Ephemeral(dir) => dir.path(),
            Self::Persistent(path) => path,
        }
    }

    /// Whether the directory is removed at the end of the run.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral(_))
    }
}

/// Explicit configuration handed to every fetch operation.
#[derive(Debug)]
pub struct FetchContext {
    output_dir: PathBuf,
    scratch: ScratchDir,
}

impl FetchContext {
    /// Creates the output directory if missing and bundles it with `scratch`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::OutputDir`] if the output directory cannot be created.
    pub fn new(output_dir: impl Into<PathBuf>, scratch: ScratchDir) -> Result<Self, ContextError> {
        let output_dir = output_dir.into();
        if !output_dir.exists() {
            std::fs::create_dir_all(&output_dir).map_err(|source| ContextError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;
            info!(dir = %output_dir.display(), "created output directory");
        }
        Ok(Self {
            output_dir,
            scratch,
        })
    }

    /// Base directory that manifest destinations are relative to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Root of the scratch space.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Private scratch subdirectory for one entry. Not created here.
    #[must_use]
    pub fn entry_scratch(&self, entry: &ManifestEntry) -> PathBuf {
        self.scratch.path().join(entry.slug())
    }

    /// Whether the scratch space is removed at the end of the run.
    #[must_use]
    pub fn has_ephemeral_scratch(&self) -> bool {
        self.scratch.is_ephemeral()
    }

    /// Deletes the `<dest>.part` files that interrupted entries of `manifest`
    /// left in the output directory. Returns how many were removed.
    pub fn remove_partial_outputs(&self, manifest: &Manifest) -> usize {
        let mut removed = 0;
        for entry in manifest.entries() {
            let dest = entry.resolve_destination(&self.output_dir);
            let candidates = match &entry.source {
                Source::GithubRelease { pattern, .. } => release_partials(&dest, pattern),
                _ => vec![partial_path(&dest)],
            };
            for path in candidates {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "removed partial output");
                        removed += 1;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "cannot remove partial output");
                    }
                }
            }
        }
        removed
    }

    /// Releases the context, removing an ephemeral scratch directory and
    /// reporting removal errors that a plain drop would swallow.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Scratch`] if the temp directory cannot be removed.
    pub fn close(self) -> Result<(), ContextError> {
        match self.scratch {
            ScratchDir::Ephemeral(dir) => {
                let path = dir.path().to_path_buf();
                dir.close().map_err(|source| {
                    warn!(path = %path.display(), error = %source, "failed to remove scratch directory");
                    ContextError::Scratch {
                        path: path.clone(),
                        source,
                    }
                })?;
                debug!(path = %path.display(), "removed scratch directory");
                Ok(())
            }
            ScratchDir::Persistent(path) => {
                debug!(path = %path.display(), "keeping work directory");
                Ok(())
            }
        }
    }
}

/// Partial release downloads in `dir` whose names match the asset `pattern`.
fn release_partials(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let Ok(pattern) = glob::Pattern::new(&format!("{pattern}{PARTIAL_SUFFIX}")) else {
        return Vec::new();
    };
    let Ok(listing) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    listing
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name))
        })
        .collect()
}

/// Directory containing the running executable, the default output location.
///
/// # Errors
///
/// Returns [`ContextError::ExecutableLocation`] if the executable path cannot
/// be resolved.
pub fn default_output_dir() -> Result<PathBuf, ContextError> {
    let exe = std::env::current_exe()
        .and_then(|p| p.canonicalize())
        .map_err(|source| ContextError::ExecutableLocation { source })?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ContextError::ExecutableLocation {
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "executable path has no parent directory",
            ),
        })
}
