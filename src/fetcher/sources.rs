//! The four fetch operations, one per [`Source`] kind.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use url::Url;

use super::FetchError;
use super::Shared;
use crate::convert::{ConvertError, PdfPipeline};
use crate::download::partial_path;
use crate::manifest::{BuildRecipe, ManifestEntry, Source};
use crate::mirror::{Mirror, MirrorError};
use crate::tools::ToolCommand;
use crate::vcs::GitClient;

/// Where one entry reads and writes.
#[derive(Debug, Clone)]
pub(crate) struct EntryPaths {
    /// Resolved destination (file, or directory for release assets).
    pub destination: PathBuf,
    /// The entry's private scratch subdirectory.
    pub scratch: PathBuf,
}

/// Artifacts and recoverable problems of a successful entry.
#[derive(Debug, Default)]
pub(crate) struct Fetched {
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl Fetched {
    fn single(path: PathBuf) -> Self {
        Self {
            artifacts: vec![path],
            warnings: Vec::new(),
        }
    }
}

pub(crate) async fn fetch_entry(
    shared: &Shared,
    entry: &ManifestEntry,
    paths: &EntryPaths,
) -> Result<Fetched, FetchError> {
    match &entry.source {
        Source::Url { url } => fetch_url(shared, url, &paths.destination).await,
        Source::GithubRelease { repo, pattern } => {
            fetch_release(shared, repo, pattern, &paths.destination).await
        }
        Source::HtmlBook { root_url } => fetch_html_book(shared, root_url, paths).await,
        Source::GitBuild { repo_url, recipe } => {
            fetch_git_build(shared, repo_url, recipe, paths).await
        }
    }
}

async fn fetch_url(shared: &Shared, url: &str, dest: &Path) -> Result<Fetched, FetchError> {
    let file = shared.http.download_to_path(url, dest).await?;
    Ok(Fetched::single(file.path))
}

async fn fetch_release(
    shared: &Shared,
    repo: &str,
    pattern: &str,
    dest_dir: &Path,
) -> Result<Fetched, FetchError> {
    let files = shared
        .releases
        .download_latest_assets(repo, pattern, dest_dir)
        .await?;
    Ok(Fetched {
        artifacts: files.into_iter().map(|f| f.path).collect(),
        warnings: Vec::new(),
    })
}

#[instrument(skip(shared, paths), fields(dest = %paths.destination.display()))]
async fn fetch_html_book(
    shared: &Shared,
    root_url: &str,
    paths: &EntryPaths,
) -> Result<Fetched, FetchError> {
    let root = Url::parse(root_url).map_err(|_| MirrorError::InvalidRoot {
        url: root_url.to_string(),
    })?;
    let tree = paths.scratch.join("tree");
    let pdf_dir = paths.scratch.join("pdf");
    remove_dir_if_present(&tree).await?;
    remove_dir_if_present(&pdf_dir).await?;

    let mirror = Mirror::new(&shared.http)
        .with_max_pages(shared.max_pages)
        .mirror(&root, &tree)
        .await?;

    let mut warnings: Vec<String> = mirror
        .failures
        .iter()
        .map(|(url, reason)| format!("skipped {url}: {reason}"))
        .collect();
    if mirror.truncated {
        warnings.push(format!(
            "stopped after {} pages; the book may be incomplete",
            mirror.pages.len()
        ));
    }

    let pipeline = PdfPipeline::new(
        shared.runner.as_ref(),
        &shared.tools.html_to_pdf,
        &shared.tools.pdf_concat,
    );
    let conversion = pipeline.convert_pages(&mirror.pages, &pdf_dir).await?;
    warnings.extend(
        conversion
            .failed
            .iter()
            .map(|(page, err)| format!("page {} omitted: {err}", page.url)),
    );
    if conversion.converted.is_empty() {
        return Err(ConvertError::NothingConverted {
            pages: mirror.pages.len(),
        }
        .into());
    }

    let converted = &conversion.converted;
    write_via_partial(&paths.destination, |partial| async move {
        pipeline
            .concatenate(converted, &partial)
            .await
            .map_err(FetchError::from)
    })
    .await?;

    for dir in [&tree, &pdf_dir] {
        if let Err(e) = tokio::fs::remove_dir_all(dir).await {
            debug!(dir = %dir.display(), error = %e, "leaving intermediate files for scratch cleanup");
        }
    }

    info!(
        pages = conversion.converted.len(),
        omitted = conversion.failed.len(),
        "book assembled"
    );
    Ok(Fetched {
        artifacts: vec![paths.destination.clone()],
        warnings,
    })
}

#[instrument(skip(shared, recipe, paths), fields(dest = %paths.destination.display()))]
async fn fetch_git_build(
    shared: &Shared,
    repo_url: &str,
    recipe: &BuildRecipe,
    paths: &EntryPaths,
) -> Result<Fetched, FetchError> {
    let checkout = paths.scratch.join("repo");
    let action = GitClient::new(shared.runner.as_ref(), &shared.tools.git)
        .sync(repo_url, &checkout)
        .await?;
    debug!(?action, "checkout ready");

    let build_dir = match &recipe.subdir {
        Some(subdir) => checkout.join(subdir),
        None => checkout.clone(),
    };
    let mut build = ToolCommand::new(&shared.tools.make).cwd(&build_dir);
    if let Some(target) = &recipe.target {
        build = build.arg(target);
    }
    shared
        .runner
        .run(&build)
        .await
        .map_err(FetchError::Build)?;

    let artifact = checkout.join(&recipe.artifact);
    if !artifact.is_file() {
        return Err(FetchError::MissingArtifact { path: artifact });
    }

    let source = &artifact;
    let bytes = write_via_partial(&paths.destination, |partial| async move {
        tokio::fs::copy(source, &partial)
            .await
            .map_err(|e| FetchError::io(&partial, e))
    })
    .await?;

    info!(artifact = %artifact.display(), bytes, "built artifact copied");
    Ok(Fetched::single(paths.destination.clone()))
}

/// Runs `write` against `<dest>.part`, then renames the result over `dest`.
///
/// Parent directories are created first. The partial file is removed if
/// either step fails, so `dest` keeps its previous contents.
async fn write_via_partial<F, Fut, T>(dest: &Path, write: F) -> Result<T, FetchError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FetchError::io(parent, e))?;
    }
    let partial = partial_path(dest);
    let value = match write(partial.clone()).await {
        Ok(value) => value,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };
    replace_file(&partial, dest).await?;
    Ok(value)
}

async fn replace_file(partial: &Path, dest: &Path) -> Result<(), FetchError> {
    if let Err(e) = tokio::fs::rename(partial, dest).await {
        let _ = tokio::fs::remove_file(partial).await;
        return Err(FetchError::io(dest, e));
    }
    Ok(())
}

async fn remove_dir_if_present(dir: &Path) -> Result<(), FetchError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FetchError::io(dir, e)),
    }
}
