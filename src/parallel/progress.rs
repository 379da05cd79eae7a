//! Progress tracking for pipeline runs

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::ProgressBar;
use tracing::debug;

use crate::parallel::outcome::{OutcomeStatus, ProcessingOutcome};

/// Thread-safe progress tracker shared by all workers
///
/// Counters are atomics so workers never contend on a lock when a file
/// finishes. An attached progress bar shows the counters as its prefix;
/// elapsed time, speed and ETA come from the bar template.
pub struct ProgressTracker {
    bar: Option<ProgressBar>,
    succeeded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressTracker {
    /// Create a tracker without visual output
    pub fn new() -> Self {
        Self {
            bar: None,
            succeeded: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Create a tracker that drives `bar`
    pub fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar: Some(bar),
            ..Self::new()
        }
    }

    /// Reset counters for a run over `total_files`
    pub fn start(&self, total_files: u64) {
        self.succeeded.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);

        if let Some(bar) = &self.bar {
            bar.set_length(total_files);
            bar.set_position(0);
            bar.reset_elapsed();
            bar.set_prefix(self.counts_text());
        }

        debug!("Started progress tracking for {} files", total_files);
    }

    /// Note that a worker picked up `relative_path`
    pub fn file_started(&self, relative_path: &Path) {
        if let Some(bar) = &self.bar {
            bar.set_message(relative_path.display().to_string());
        }
    }

    /// Record a finished file
    pub fn file_finished(&self, outcome: &ProcessingOutcome) {
        let counter = match outcome.status {
            OutcomeStatus::Success { .. } => &self.succeeded,
            OutcomeStatus::Skipped { .. } => &self.skipped,
            OutcomeStatus::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if let Some(bar) = &self.bar {
            bar.set_prefix(self.counts_text());
            bar.inc(1);
        }
    }

    /// Close out the run
    pub fn finish(&self) {
        debug!("Progress finished: {}", self.counts_text());
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Succeeded, skipped and failed files so far
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.succeeded.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }

    fn counts_text(&self) -> String {
        let (succeeded, skipped, failed) = self.counts();
        format!("{} ok, {} skipped, {} failed", succeeded, skipped, failed)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn outcome(status: OutcomeStatus) -> ProcessingOutcome {
        ProcessingOutcome {
            relative_path: PathBuf::from("a.jpg"),
            status,
            input_bytes: 0,
            output_bytes: 0,
        }
    }

    #[test]
    fn test_progress_tracker_counts() {
        let tracker = ProgressTracker::new();
        tracker.start(4);

        tracker.file_finished(&outcome(OutcomeStatus::Success { variants: 4 }));
        tracker.file_finished(&outcome(OutcomeStatus::Skipped { reason: "x".into() }));
        tracker.file_finished(&outcome(OutcomeStatus::Failed { failures: vec![] }));

        assert_eq!(tracker.counts(), (1, 1, 1));
    }

    #[test]
    fn test_bar_follows_counters() {
        let bar = ProgressBar::hidden();
        let tracker = ProgressTracker::with_bar(bar.clone());
        tracker.start(3);
        tracker.file_started(Path::new("a/b.png"));
        tracker.file_finished(&outcome(OutcomeStatus::Success { variants: 1 }));

        assert_eq!(bar.length(), Some(3));
        assert_eq!(bar.position(), 1);
        assert_eq!(bar.message(), "a/b.png");
        assert_eq!(bar.prefix(), "1 ok, 0 skipped, 0 failed");
    }

    #[test]
    fn test_start_resets_counters() {
        let tracker = ProgressTracker::with_bar(ProgressBar::hidden());
        tracker.start(1);
        tracker.file_finished(&outcome(OutcomeStatus::Success { variants: 1 }));
        tracker.start(2);

        assert_eq!(tracker.counts(), (0, 0, 0));
    }
}
