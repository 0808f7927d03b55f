//! Runs a manifest and collects one outcome per entry.
//!
//! Entries run as Tokio tasks gated by a semaphore. With the default
//! concurrency of one they run strictly in manifest order. Every entry yields
//! an [`EntryOutcome`]; a failing entry never prevents the others from running
//! unless fail-fast is requested, in which case entries not yet started are
//! reported as skipped.
//!
//! Dropping the future returned by [`Fetcher::run`] aborts in-flight entries,
//! which also kills any external tool they were running.

mod error;
mod outcome;
mod sources;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::context::FetchContext;
use crate::download::HttpClient;
use crate::github::ReleaseClient;
use crate::manifest::{Manifest, ManifestEntry};
use crate::mirror::DEFAULT_MAX_PAGES;
use crate::tools::{CommandRunner, Toolchain};

pub use error::FetchError;
pub use outcome::{EntryOutcome, EntryStatus, ExitOutcome, RunReport, determine_exit_outcome};

use sources::{EntryPaths, fetch_entry};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 16;

/// Reason recorded for entries skipped after a fail-fast stop.
const SKIPPED_AFTER_FAILURE: &str = "not started after an earlier failure (--fail-fast)";

/// Scheduling options for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Entries processed at once, clamped to `MIN_CONCURRENCY..=MAX_CONCURRENCY`.
    pub concurrency: usize,
    /// Stop starting new entries after the first failure.
    pub fail_fast: bool,
    /// Page cap for HTML books.
    pub max_pages: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: MIN_CONCURRENCY,
            fail_fast: false,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Receives progress notifications from a run.
///
/// Called from worker tasks, so implementations must be thread-safe.
pub trait RunObserver: Send + Sync {
    /// An entry is about to start.
    fn entry_started(&self, _entry: &ManifestEntry) {}

    /// An entry finished, successfully or not.
    fn entry_finished(&self, _outcome: &EntryOutcome) {}
}

/// State shared by every entry task.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) http: HttpClient,
    pub(crate) releases: ReleaseClient,
    pub(crate) runner: Arc<dyn CommandRunner>,
    pub(crate) tools: Toolchain,
    pub(crate) max_pages: usize,
}

/// Executes manifests.
#[derive(Clone)]
pub struct Fetcher {
    shared: Arc<Shared>,
    options: FetchOptions,
    observer: Option<Arc<dyn RunObserver>>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("shared", &self.shared)
            .field("options", &self.options)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Fetcher {
    /// Creates a fetcher from its collaborators.
    pub fn new(
        http: HttpClient,
        releases: ReleaseClient,
        runner: Arc<dyn CommandRunner>,
        tools: Toolchain,
        options: FetchOptions,
    ) -> Self {
        let options = FetchOptions {
            concurrency: options.concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY),
            max_pages: options.max_pages.max(1),
            ..options
        };
        debug!(
            concurrency = options.concurrency,
            fail_fast = options.fail_fast,
            max_pages = options.max_pages,
            "creating fetcher"
        );
        Self {
            shared: Arc::new(Shared {
                http,
                releases,
                runner,
                tools,
                max_pages: options.max_pages,
            }),
            options,
            observer: None,
        }
    }

    /// Attaches a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The effective options after clamping.
    #[must_use]
    pub fn options(&self) -> FetchOptions {
        self.options
    }

    /// Processes every entry of `manifest` and returns their outcomes in
    /// manifest order.
    ///
    /// Individual entry failures never make this method fail; they are
    /// recorded in the report.
    #[instrument(skip_all, fields(entries = manifest.len(), output_dir = %ctx.output_dir().display()))]
    pub async fn run(&self, manifest: &Manifest, ctx: &FetchContext) -> RunReport {
        let entries = manifest.entries();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let halted = Arc::new(AtomicBool::new(false));
        let mut tasks: JoinSet<(usize, EntryOutcome)> = JoinSet::new();
        let mut task_index = HashMap::new();
        let mut outcomes: Vec<Option<EntryOutcome>> = vec![None; entries.len()];

        info!("starting run");

        for (index, entry) in entries.iter().enumerate() {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                warn!("semaphore closed unexpectedly, not starting remaining entries");
                break;
            };
            if halted.load(Ordering::SeqCst) {
                debug!(label = %entry.label, "fail-fast stop, not starting entry");
                break;
            }

            let entry = entry.clone();
            let paths = EntryPaths {
                destination: entry.resolve_destination(ctx.output_dir()),
                scratch: ctx.entry_scratch(&entry),
            };
            let shared = Arc::clone(&self.shared);
            let observer = self.observer.clone();
            let halted = Arc::clone(&halted);
            let fail_fast = self.options.fail_fast;

            let handle = tasks.spawn(async move {
                let _permit = permit;
                if let Some(observer) = &observer {
                    observer.entry_started(&entry);
                }

                let outcome = run_entry(&shared, &entry, &paths).await;

                if fail_fast && outcome.is_failure() {
                    halted.store(true, Ordering::SeqCst);
                }
                if let Some(observer) = &observer {
                    observer.entry_finished(&outcome);
                }
                (index, outcome)
            });
            task_index.insert(handle.id(), index);
        }

        debug!(task_count = tasks.len(), "waiting for entries to finish");

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => {
                    warn!(error = %e, "entry task ended abnormally");
                    if let Some(&index) = task_index.get(&e.id()) {
                        let outcome = EntryOutcome::failed(
                            entries[index].label.clone(),
                            FetchError::Task(e.to_string()).to_string(),
                            std::time::Duration::ZERO,
                        );
                        outcomes[index] = Some(outcome);
                    }
                }
            }
        }

        let outcomes: Vec<EntryOutcome> = outcomes
            .into_iter()
            .zip(entries)
            .map(|(outcome, entry)| {
                outcome.unwrap_or_else(|| EntryOutcome::skipped(&entry.label, SKIPPED_AFTER_FAILURE))
            })
            .collect();
        let report = RunReport::new(outcomes);

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            warnings = report.warnings(),
            "run complete"
        );
        report
    }
}

#[instrument(skip(shared, entry, paths), fields(label = %entry.label, kind = entry.source.kind()))]
async fn run_entry(shared: &Shared, entry: &ManifestEntry, paths: &EntryPaths) -> EntryOutcome {
    let started = Instant::now();
    info!(source = %entry.source, "fetching");

    match fetch_entry(shared, entry, paths).await {
        Ok(fetched) => {
            for warning in &fetched.warnings {
                warn!(warning = %warning, "entry completed with a warning");
            }
            info!(
                artifacts = fetched.artifacts.len(),
                elapsed_ms = started.elapsed().as_millis(),
                "entry completed"
            );
            EntryOutcome::succeeded(
                entry.label.clone(),
                fetched.artifacts,
                fetched.warnings,
                started.elapsed(),
            )
        }
        Err(e) => {
            let error = error_chain(&e);
            warn!(error = %error, "entry failed");
            EntryOutcome::failed(entry.label.clone(), error, started.elapsed())
        }
    }
}

/// Renders an error with its sources, outermost first.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
