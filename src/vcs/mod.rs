//! Git checkouts used by clone-and-build entries.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::tools::{CommandRunner, ToolCommand, ToolError};

/// Errors raised while preparing a checkout.
#[derive(Debug, Error)]
pub enum VcsError {
    /// `git clone` or `git pull` failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Preparing the checkout location failed.
    #[error("IO error preparing checkout {path}: {source}")]
    Io {
        /// The checkout path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// What [`GitClient::sync`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// A fresh clone was made.
    Cloned,
    /// An existing clone was updated.
    Pulled,
}

/// Thin wrapper over the `git` command line.
#[derive(Debug, Clone, Copy)]
pub struct GitClient<'a> {
    runner: &'a dyn CommandRunner,
    program: &'a str,
}

impl<'a> GitClient<'a> {
    /// Creates a client running `program` through `runner`.
    pub fn new(runner: &'a dyn CommandRunner, program: &'a str) -> Self {
        Self { runner, program }
    }

    /// Clones `repo_url` into `checkout`, or pulls if a clone is already there.
    ///
    /// A directory at `checkout` that is not a repository (for example the
    /// remains of an interrupted clone) is removed and cloned afresh.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError`] if git fails or the location cannot be prepared.
    #[instrument(skip(self), fields(checkout = %checkout.display()))]
    pub async fn sync(&self, repo_url: &str, checkout: &Path) -> Result<SyncAction, VcsError> {
        if is_repository(checkout) {
            info!(repo = %repo_url, "pulling existing checkout");
            let cmd = ToolCommand::new(self.program)
                .args(["pull", "--ff-only"])
                .cwd(checkout);
            self.runner.run(&cmd).await?;
            return Ok(SyncAction::Pulled);
        }

        if checkout.exists() {
            warn!("removing incomplete checkout before cloning");
            tokio::fs::remove_dir_all(checkout)
                .await
                .map_err(|source| VcsError::Io {
                    path: checkout.to_path_buf(),
                    source,
                })?;
        }
        if let Some(parent) = checkout.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| VcsError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        info!(repo = %repo_url, "cloning");
        let cmd = ToolCommand::new(self.program)
            .args(["clone", "--depth", "1", repo_url])
            .arg(checkout);
        self.runner.run(&cmd).await?;
        Ok(SyncAction::Cloned)
    }
}

/// Whether `path` holds a Git working tree.
#[must_use]
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}
