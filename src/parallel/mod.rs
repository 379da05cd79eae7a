//! Pipeline orchestration on a bounded worker pool

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AssetPipeError, ErrorContext, Result};
use crate::processing::{
    CodecService, FileTask, ImageCodec, PlanDecision, TreeWalker, Variant, VariantKind,
    VariantPlan, VariantPlanner,
};

pub mod outcome;
pub mod progress;

pub use outcome::*;
pub use progress::*;

/// Reason recorded for files that were never started because of an interrupt
pub const CANCELLED: &str = "run cancelled";

/// A discovered file together with its plan
///
/// `collisions` runs parallel to the plan's variants: an entry is the source
/// file that claimed the same output path first.
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub task: FileTask,
    pub decision: PlanDecision,
    pub collisions: Vec<Option<PathBuf>>,
}

impl PlannedTask {
    /// Variants that will actually be attempted, in order
    pub fn variants(&self) -> &[Variant] {
        match &self.decision {
            PlanDecision::Process(plan) => &plan.variants,
            PlanDecision::Skip { .. } => &[],
        }
    }
}

/// Walks the input tree, plans every file and executes the plans
pub struct Pipeline {
    config: Config,
    planner: VariantPlanner,
    codec: Arc<dyn CodecService>,
    progress: Arc<ProgressTracker>,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    /// Create a pipeline with the stock codec
    ///
    /// Fails on any configuration error, before the filesystem is touched.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let planner = VariantPlanner::new(&config)?;
        let codec = Arc::new(ImageCodec::from_config(&config.processing));

        Ok(Self {
            config,
            planner,
            codec,
            progress: Arc::new(ProgressTracker::new()),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Swap in another codec implementation
    pub fn with_codec(mut self, codec: Arc<dyn CodecService>) -> Self {
        self.codec = codec;
        self
    }

    /// Report progress through `progress`
    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    /// Flag that stops the run from starting further files once set
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Walk the input root into file tasks
    ///
    /// Walk errors are fatal: an unreadable directory or a link cycle would
    /// otherwise silently drop part of the tree.
    pub fn discover(&self) -> Result<Vec<FileTask>> {
        let input = &self.config.input_folder;
        let output = &self.config.output_folder;

        TreeWalker::with_options(input, self.config.processing.follow_symlinks)?
            .map(|entry| FileTask::new(input, output, entry?))
            .collect()
    }

    /// Discover and plan every file without writing anything
    ///
    /// Output paths are claimed in walk order. A variant whose path was
    /// already claimed by an earlier file is marked as a collision.
    pub fn plan(&self) -> Result<Vec<PlannedTask>> {
        let tasks = self.discover()?;
        debug!("Discovered {} files", tasks.len());

        let mut claims: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut planned = Vec::with_capacity(tasks.len());

        for task in tasks {
            let decision = self.planner.plan(&task.mapped);

            let mut collisions = Vec::new();
            if let PlanDecision::Process(plan) = &decision {
                for variant in &plan.variants {
                    let collision = match claims.entry(variant.output_path.clone()) {
                        Entry::Occupied(owner) => Some(owner.get().clone()),
                        Entry::Vacant(slot) => {
                            slot.insert(task.relative_path().to_path_buf());
                            None
                        }
                    };
                    collisions.push(collision);
                }
            }

            planned.push(PlannedTask {
                task,
                decision,
                collisions,
            });
        }

        Ok(planned)
    }

    /// Run the whole pipeline and return the summary
    ///
    /// Only configuration and walk errors come back as `Err`. Everything that
    /// goes wrong with a single file ends up in its outcome.
    pub fn run(&self) -> Result<RunSummary> {
        self.config.validate_paths()?;
        let planned = self.plan()?;

        let threads = self.config.processing.effective_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("assetpipe-worker-{}", i))
            .build()
            .map_err(|e| AssetPipeError::config(format!("Failed to build worker pool: {}", e)))?;

        info!("Processing {} files with {} workers", planned.len(), threads);

        let start_time = Instant::now();
        self.progress.start(planned.len() as u64);

        let outcomes: Vec<ProcessingOutcome> =
            pool.install(|| planned.par_iter().map(|p| self.process(p)).collect());

        self.progress.finish();

        let summary = RunSummary::from_outcomes(outcomes, start_time.elapsed());
        info!("{}", summary.summary_line());
        Ok(summary)
    }

    /// Drive one file to a terminal state
    fn process(&self, planned: &PlannedTask) -> ProcessingOutcome {
        let relative_path = planned.task.relative_path().to_path_buf();

        let outcome = if self.cancel.load(Ordering::Relaxed) {
            ProcessingOutcome::skipped(relative_path, CANCELLED)
        } else {
            self.progress.file_started(&relative_path);

            match &planned.decision {
                PlanDecision::Skip { reason } => {
                    info!("Skipping {}: {}", relative_path.display(), reason);
                    ProcessingOutcome::skipped(relative_path, reason.clone())
                }
                PlanDecision::Process(plan) => self.execute(&planned.task, plan, &planned.collisions),
            }
        };

        self.progress.file_finished(&outcome);
        outcome
    }

    /// Attempt every variant of a planned file, in order
    fn execute(&self, task: &FileTask, plan: &VariantPlan, collisions: &[Option<PathBuf>]) -> ProcessingOutcome {
        let relative_path = task.relative_path();
        let input_bytes = std::fs::metadata(&task.input_path).map(|m| m.len()).unwrap_or(0);

        let dir_error = std::fs::create_dir_all(&task.mapped.output_dir)
            .with_file_context(task.mapped.output_dir.clone())
            .err()
            .map(|e| e.user_message());

        let mut output_bytes = 0;
        let mut failures = Vec::new();

        for (variant, claimed_by) in plan.variants.iter().zip(collisions) {
            let result = match (&dir_error, claimed_by) {
                (Some(message), _) => Err(message.clone()),
                (None, Some(owner)) => Err(AssetPipeError::OutputCollision {
                    path: variant.output_path.clone(),
                    claimed_by: owner.clone(),
                }
                .user_message()),
                (None, None) => self
                    .write_variant(&task.input_path, variant)
                    .map_err(|e| e.user_message()),
            };

            match result {
                Ok(bytes) => {
                    output_bytes += bytes;
                    info!(
                        "{} [{}] -> {} ({} bytes)",
                        relative_path.display(),
                        variant.kind.label(),
                        variant.output_path.display(),
                        bytes
                    );
                }
                Err(error) => {
                    warn!(
                        "{} [{}] failed: {}",
                        relative_path.display(),
                        variant.kind.label(),
                        error
                    );
                    failures.push(VariantFailure {
                        variant: variant.kind.label().to_string(),
                        output_path: variant.output_path.clone(),
                        error,
                    });
                }
            }
        }

        let status = if failures.is_empty() {
            OutcomeStatus::Success {
                variants: plan.len(),
            }
        } else {
            OutcomeStatus::Failed { failures }
        };

        ProcessingOutcome {
            relative_path: relative_path.to_path_buf(),
            status,
            input_bytes,
            output_bytes,
        }
    }

    fn write_variant(&self, input: &Path, variant: &Variant) -> Result<u64> {
        match &variant.kind {
            VariantKind::OptimizedOriginal { settings } => {
                self.codec.compress(input, &variant.output_path, settings)
            }
            VariantKind::ResizedWebp { width, .. } => {
                self.codec.resize_reencode(input, &variant.output_path, *width)
            }
        }
    }
}
