//! Per-entry outcomes and the aggregated run report.

use std::path::PathBuf;
use std::time::Duration;

/// How an entry ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// The entry produced its artifacts.
    Succeeded {
        /// Files written under the output directory.
        artifacts: Vec<PathBuf>,
    },
    /// The entry failed; its previous outputs, if any, are untouched.
    Failed {
        /// Rendered error chain.
        error: String,
    },
    /// The entry never started.
    Skipped {
        /// Why it was not attempted.
        reason: String,
    },
}

/// Result of processing one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutcome {
    /// Manifest label.
    pub label: String,
    /// Final status.
    pub status: EntryStatus,
    /// Recoverable problems, such as pages omitted from a book.
    pub warnings: Vec<String>,
    /// Wall-clock time spent on the entry.
    pub elapsed: Duration,
}

impl EntryOutcome {
    pub(crate) fn succeeded(
        label: impl Into<String>,
        artifacts: Vec<PathBuf>,
        warnings: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            status: EntryStatus::Succeeded { artifacts },
            warnings,
            elapsed,
        }
    }

    pub(crate) fn failed(label: impl Into<String>, error: String, elapsed: Duration) -> Self {
        Self {
            label: label.into(),
            status: EntryStatus::Failed { error },
            warnings: Vec::new(),
            elapsed,
        }
    }

    pub(crate) fn skipped(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            status: EntryStatus::Skipped {
                reason: reason.into(),
            },
            warnings: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Whether the entry succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, EntryStatus::Succeeded { .. })
    }

    /// Whether the entry failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, EntryStatus::Failed { .. })
    }

    /// Whether the entry was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, EntryStatus::Skipped { .. })
    }
}

/// Process-level classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Nothing failed or was skipped.
    Success,
    /// Some entries succeeded, others failed or were skipped.
    Partial,
    /// No entry succeeded.
    Failure,
}

/// Maps success and non-success counts to an [`ExitOutcome`].
#[must_use]
pub fn determine_exit_outcome(succeeded: usize, unsuccessful: usize) -> ExitOutcome {
    if unsuccessful == 0 {
        ExitOutcome::Success
    } else if succeeded > 0 {
        ExitOutcome::Partial
    } else {
        ExitOutcome::Failure
    }
}

/// All entry outcomes of a run, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    outcomes: Vec<EntryOutcome>,
}

impl RunReport {
    /// Builds a report from outcomes already in manifest order.
    #[must_use]
    pub fn new(outcomes: Vec<EntryOutcome>) -> Self {
        Self { outcomes }
    }

    /// Outcomes in manifest order.
    #[must_use]
    pub fn outcomes(&self) -> &[EntryOutcome] {
        &self.outcomes
    }

    /// Looks up an outcome by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&EntryOutcome> {
        self.outcomes.iter().find(|o| o.label == label)
    }

    /// Number of entries that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of entries that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Number of entries that were skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// Total warnings across all entries.
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.outcomes.iter().map(|o| o.warnings.len()).sum()
    }

    /// Process-level classification of this run.
    #[must_use]
    pub fn exit_outcome(&self) -> ExitOutcome {
        determine_exit_outcome(self.succeeded(), self.failed() + self.skipped())
    }
}
