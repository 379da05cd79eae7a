//! Per-file outcomes and the run summary built from them

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Why one variant of a file was not produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantFailure {
    /// Variant label (`optimized` or the breakpoint name)
    pub variant: String,
    pub output_path: PathBuf,
    pub error: String,
}

/// Terminal state of one source file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Every planned variant was written
    Success { variants: usize },
    /// Nothing was attempted
    Skipped { reason: String },
    /// At least one variant failed; the others were still attempted
    Failed { failures: Vec<VariantFailure> },
}

/// Result of processing one source file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingOutcome {
    pub relative_path: PathBuf,
    pub status: OutcomeStatus,
    /// Size of the source file, 0 when skipped
    pub input_bytes: u64,
    /// Total bytes across the variants that were written
    pub output_bytes: u64,
}

impl ProcessingOutcome {
    pub fn skipped<S: Into<String>>(relative_path: PathBuf, reason: S) -> Self {
        Self {
            relative_path,
            status: OutcomeStatus::Skipped {
                reason: reason.into(),
            },
            input_bytes: 0,
            output_bytes: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

impl fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.relative_path.display();
        match &self.status {
            OutcomeStatus::Success { variants } => write!(f, "{}: {} variants written", path, variants),
            OutcomeStatus::Skipped { reason } => write!(f, "{}: skipped ({})", path, reason),
            OutcomeStatus::Failed { failures } => {
                write!(f, "{}: failed", path)?;
                for failure in failures {
                    write!(f, "\n    {} -> {}: {}", failure.variant, failure.output_path.display(), failure.error)?;
                }
                Ok(())
            }
        }
    }
}

/// Aggregate of a whole run, computed after every file finished
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed_secs: f64,
    pub outcomes: Vec<ProcessingOutcome>,
}

impl RunSummary {
    /// Count outcomes by status
    pub fn from_outcomes(outcomes: Vec<ProcessingOutcome>, processing_time: Duration) -> Self {
        let mut summary = Self {
            elapsed_secs: processing_time.as_secs_f64(),
            ..Self::default()
        };

        for outcome in &outcomes {
            match outcome.status {
                OutcomeStatus::Success { .. } => summary.succeeded += 1,
                OutcomeStatus::Skipped { .. } => summary.skipped += 1,
                OutcomeStatus::Failed { .. } => summary.failed += 1,
            }
            summary.input_bytes += outcome.input_bytes;
            summary.output_bytes += outcome.output_bytes;
        }

        summary.outcomes = outcomes;
        summary
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    /// Failed outcomes in walk order
    pub fn failures(&self) -> impl Iterator<Item = &ProcessingOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Whether the process should exit non-zero
    ///
    /// A run fails when files failed and nothing succeeded. In strict mode
    /// any failed file fails the run.
    pub fn is_failure(&self, strict: bool) -> bool {
        self.failed > 0 && (strict || self.succeeded == 0)
    }

    /// One-line human summary
    pub fn summary_line(&self) -> String {
        format!(
            "{} succeeded, {} skipped, {} failed in {:.2}s",
            self.succeeded, self.skipped, self.failed, self.elapsed_secs
        )
    }
}
