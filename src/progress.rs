//! Progress bar counting finished entries.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use specfetch_core::{EntryOutcome, ManifestEntry, RunObserver};

/// Feeds run notifications into an `indicatif` bar on stderr.
#[derive(Debug)]
pub(crate) struct EntryProgress {
    bar: ProgressBar,
}

impl EntryProgress {
    pub(crate) fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Removes the bar so the summary prints on a clean line.
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl RunObserver for EntryProgress {
    fn entry_started(&self, entry: &ManifestEntry) {
        self.bar.set_message(format!("fetching {}", entry.label));
    }

    fn entry_finished(&self, outcome: &EntryOutcome) {
        self.bar.inc(1);
        if outcome.is_failure() {
            self.bar.set_message(format!("{} failed", outcome.label));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use specfetch_core::EntryStatus;

    use super::*;

    #[test]
    fn test_finished_entries_advance_bar() {
        let progress = EntryProgress::new(2);
        let outcome = EntryOutcome {
            label: "elf".to_string(),
            status: EntryStatus::Succeeded {
                artifacts: vec![PathBuf::from("elf.pdf")],
            },
            warnings: Vec::new(),
            elapsed: Duration::ZERO,
        };
        progress.entry_finished(&outcome);
        assert_eq!(progress.bar.position(), 1);
        progress.finish();
        assert!(progress.bar.is_finished());
    }
}
