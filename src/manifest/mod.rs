//! The fixed manifest of documents to fetch.
//!
//! A [`Manifest`] is an ordered list of [`ManifestEntry`] values, each pairing
//! a [`Source`] with a destination relative to the output directory. The
//! built-in manifest is compiled into the binary; callers may narrow it by
//! label but never extend it at runtime.

mod builtin;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::Url;

pub use builtin::builtin_entries;

/// Errors raised while building or filtering a manifest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    /// Two entries share a label.
    #[error("duplicate manifest label '{label}'")]
    DuplicateLabel {
        /// The repeated label.
        label: String,
    },

    /// A label is empty or contains whitespace or path separators.
    #[error("invalid manifest label '{label}'")]
    InvalidLabel {
        /// The offending label.
        label: String,
    },

    /// Two file entries write to the same destination.
    #[error("entries '{first}' and '{second}' both write {destination}")]
    DuplicateDestination {
        /// Label of the earlier entry.
        first: String,
        /// Label of the later entry.
        second: String,
        /// The shared destination.
        destination: String,
    },

    /// Two labels share a scratch directory name.
    #[error("labels '{first}' and '{second}' both map to scratch directory '{slug}'")]
    DuplicateSlug {
        /// Label of the earlier entry.
        first: String,
        /// Label of the later entry.
        second: String,
        /// The shared slug.
        slug: String,
    },

    /// A destination is absolute or escapes the output directory.
    #[error("destination {destination} of '{label}' must be relative and stay inside the output directory")]
    UnsafeDestination {
        /// Entry label.
        label: String,
        /// The rejected destination.
        destination: String,
    },

    /// A source URL is malformed or not HTTP(S).
    #[error("invalid source URL for '{label}': {url}")]
    InvalidUrl {
        /// Entry label.
        label: String,
        /// The rejected URL.
        url: String,
    },

    /// A GitHub repository is not in `owner/name` form.
    #[error("invalid GitHub repository for '{label}': {repo} (expected owner/name)")]
    InvalidRepo {
        /// Entry label.
        label: String,
        /// The rejected repository identifier.
        repo: String,
    },

    /// A release asset glob does not compile.
    #[error("invalid asset pattern for '{label}': {pattern}")]
    InvalidPattern {
        /// Entry label.
        label: String,
        /// The rejected pattern.
        pattern: String,
    },

    /// A label given on the command line names no entry.
    #[error("unknown manifest label '{label}' (known: {known})")]
    UnknownLabel {
        /// The unknown label.
        label: String,
        /// Comma-separated list of known labels.
        known: String,
    },
}

/// How to build the artifact inside a cloned repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecipe {
    /// Directory inside the checkout where the build tool runs.
    pub subdir: Option<PathBuf>,
    /// Optional build target passed to the build tool.
    pub target: Option<String>,
    /// Artifact path relative to the checkout root.
    pub artifact: PathBuf,
}

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A static file served at a fixed URL.
    Url {
        /// The document URL.
        url: String,
    },
    /// Assets attached to the latest release of a GitHub repository.
    GithubRelease {
        /// Repository in `owner/name` form.
        repo: String,
        /// Glob matched against asset names.
        pattern: String,
    },
    /// A tree of HTML pages mirrored, converted to PDF, and concatenated.
    HtmlBook {
        /// First page; crawling stays below its parent directory.
        root_url: String,
    },
    /// A Git repository cloned and built locally.
    GitBuild {
        /// Clone URL.
        repo_url: String,
        /// Build instructions.
        recipe: BuildRecipe,
    },
}

impl Source {
    /// Short stable name of the source kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url { .. } => "url",
            Self::GithubRelease { .. } => "github-release",
            Self::HtmlBook { .. } => "html-book",
            Self::GitBuild { .. } => "git-build",
        }
    }

    /// Whether the destination names a directory rather than a file.
    #[must_use]
    pub fn writes_directory(&self) -> bool {
        matches!(self, Self::GithubRelease { .. })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url { url } => write!(f, "{url}"),
            Self::GithubRelease { repo, pattern } => {
                write!(f, "github.com/{repo} latest release [{pattern}]")
            }
            Self::HtmlBook { root_url } => write!(f, "{root_url} (html -> pdf)"),
            Self::GitBuild { repo_url, recipe } => {
                write!(f, "{repo_url} (build {})", recipe.artifact.display())
            }
        }
    }
}

/// One fetch instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Unique label, also used on the command line.
    pub label: String,
    /// Where the document comes from.
    pub source: Source,
    /// Destination relative to the output directory.
    pub destination: PathBuf,
}

impl ManifestEntry {
    /// Entry for a file served at a fixed URL.
    pub fn url(label: impl Into<String>, url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            source: Source::Url { url: url.into() },
            destination: dest.into(),
        }
    }

    /// Entry for GitHub release assets matching `pattern`, saved into `dest_dir`.
    pub fn github_release(
        label: impl Into<String>,
        repo: impl Into<String>,
        pattern: impl Into<String>,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            source: Source::GithubRelease {
                repo: repo.into(),
                pattern: pattern.into(),
            },
            destination: dest_dir.into(),
        }
    }

    /// Entry for an HTML page tree rendered into one PDF.
    pub fn html_book(
        label: impl Into<String>,
        root_url: impl Into<String>,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            source: Source::HtmlBook {
                root_url: root_url.into(),
            },
            destination: dest.into(),
        }
    }

    /// Entry for an artifact built from a cloned repository.
    pub fn git_build(
        label: impl Into<String>,
        repo_url: impl Into<String>,
        recipe: BuildRecipe,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            source: Source::GitBuild {
                repo_url: repo_url.into(),
                recipe,
            },
            destination: dest.into(),
        }
    }

    /// Label reduced to characters safe for a directory name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.label
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect()
    }

    /// Resolves the destination against `output_dir`.
    #[must_use]
    pub fn resolve_destination(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.destination)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        if self.label.is_empty()
            || self
                .label
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(ManifestError::InvalidLabel {
                label: self.label.clone(),
            });
        }

        if !is_contained_relative(&self.destination) {
            return Err(ManifestError::UnsafeDestination {
                label: self.label.clone(),
                destination: self.destination.display().to_string(),
            });
        }

        match &self.source {
            Source::Url { url } | Source::HtmlBook { root_url: url } => {
                self.validate_http_url(url)?;
            }
            Source::GitBuild { repo_url, recipe } => {
                if Url::parse(repo_url).is_err() {
                    return Err(ManifestError::InvalidUrl {
                        label: self.label.clone(),
                        url: repo_url.clone(),
                    });
                }
                let subdir_ok = recipe
                    .subdir
                    .as_deref()
                    .is_none_or(is_contained_relative);
                if !subdir_ok || !is_contained_relative(&recipe.artifact) {
                    return Err(ManifestError::UnsafeDestination {
                        label: self.label.clone(),
                        destination: recipe.artifact.display().to_string(),
                    });
                }
            }
            Source::GithubRelease { repo, pattern } => {
                if split_repo(repo).is_none() {
                    return Err(ManifestError::InvalidRepo {
                        label: self.label.clone(),
                        repo: repo.clone(),
                    });
                }
                if glob::Pattern::new(pattern).is_err() {
                    return Err(ManifestError::InvalidPattern {
                        label: self.label.clone(),
                        pattern: pattern.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn validate_http_url(&self, url: &str) -> Result<(), ManifestError> {
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
            _ => Err(ManifestError::InvalidUrl {
                label: self.label.clone(),
                url: url.to_string(),
            }),
        }
    }
}

/// Splits `owner/name` into its parts.
#[must_use]
pub fn split_repo(repo: &str) -> Option<(&str, &str)> {
    let (owner, name) = repo.split_once('/')?;
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    (valid(owner) && valid(name)).then_some((owner, name))
}

fn is_contained_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// An ordered, validated list of fetch instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Builds a manifest, validating labels, destinations, and sources.
    ///
    /// # Errors
    ///
    /// Returns the first [`ManifestError`] found, in entry order.
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self, ManifestError> {
        let mut labels = HashSet::new();
        let mut slugs: HashMap<String, &str> = HashMap::new();
        let mut destinations: Vec<(&Path, &str)> = Vec::new();

        for entry in &entries {
            entry.validate()?;

            if !labels.insert(entry.label.as_str()) {
                return Err(ManifestError::DuplicateLabel {
                    label: entry.label.clone(),
                });
            }

            let slug = entry.slug();
            if let Some(first) = slugs.get(&slug) {
                return Err(ManifestError::DuplicateSlug {
                    first: (*first).to_string(),
                    second: entry.label.clone(),
                    slug,
                });
            }
            slugs.insert(slug, &entry.label);

            if entry.source.writes_directory() {
                continue;
            }
            if let Some((_, first)) = destinations
                .iter()
                .find(|(dest, _)| *dest == entry.destination.as_path())
            {
                return Err(ManifestError::DuplicateDestination {
                    first: (*first).to_string(),
                    second: entry.label.clone(),
                    destination: entry.destination.display().to_string(),
                });
            }
            destinations.push((&entry.destination, &entry.label));
        }

        Ok(Self { entries })
    }

    /// The compiled-in manifest.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] only if the built-in table is malformed.
    pub fn builtin() -> Result<Self, ManifestError> {
        Self::new(builtin_entries())
    }

    /// Entries in manifest order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All labels in manifest order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    /// Keeps only the entries whose label is in `labels`, preserving manifest order.
    ///
    /// An empty `labels` slice keeps everything.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UnknownLabel`] for the first label that names no entry.
    pub fn select<S: AsRef<str>>(self, labels: &[S]) -> Result<Self, ManifestError> {
        if labels.is_empty() {
            return Ok(self);
        }

        for wanted in labels {
            let wanted = wanted.as_ref();
            if !self.entries.iter().any(|e| e.label == wanted) {
                return Err(ManifestError::UnknownLabel {
                    label: wanted.to_string(),
                    known: self.labels().collect::<Vec<_>>().join(", "),
                });
            }
        }

        let entries = self
            .entries
            .into_iter()
            .filter(|e| labels.iter().any(|l| l.as_ref() == e.label))
            .collect();
        Ok(Self { entries })
    }
}

impl IntoIterator for Manifest {
    type Item = ManifestEntry;
    type IntoIter = std::vec::IntoIter<ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
