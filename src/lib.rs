//! AssetPipe - Batch Image-Asset Pipeline
//!
//! Walks a source image tree and mirrors it into an output tree. Every
//! supported image gets an optimized copy in its own format plus one resized
//! WebP variant per configured breakpoint.
//!
//! # Features
//!
//! - **Mirrored Output**: `in/d/name.jpg` becomes `out/d/name.jpg` and `out/d/name-<breakpoint>.webp`
//! - **Fault Isolation**: a corrupt file is recorded as failed, the rest of the tree still runs
//! - **Parallel Processing**: files are spread over a bounded worker pool
//! - **Atomic Writes**: outputs are renamed into place, never left half written
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use assetpipe::{BreakpointSpec, Config, Pipeline};
//!
//! let mut config = Config::default();
//! config.input_folder = "assets/img".into();
//! config.output_folder = "dist/assets/img".into();
//! config.breakpoints = vec![BreakpointSpec::new("mobile", 480)];
//!
//! let summary = Pipeline::new(config)?.run()?;
//! println!("{}", summary.summary_line());
//! # Ok::<(), assetpipe::AssetPipeError>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{BreakpointSpec, Config, PngQualityRange};
pub use error::{AssetPipeError, Result};
pub use parallel::{Pipeline, ProcessingOutcome, ProgressTracker, RunSummary};
pub use processing::{CodecService, ImageCodec, VariantPlanner};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with default settings
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Calling this
/// more than once is harmless.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .is_ok()
    {
        info!("AssetPipe v{} initialized", VERSION);
    }

    log_capabilities();
    Ok(())
}

/// Initialize logging from the `logging` section of a configuration
///
/// A `RUST_LOG` that parses takes precedence over the configured level.
pub fn init_with_config(config: &Config) -> Result<()> {
    let filter = log_filter(std::env::var("RUST_LOG").ok(), &config.logging.level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.logging.json_format {
        tracing::subscriber::set_global_default(builder.json().finish()).is_ok()
    } else {
        tracing::subscriber::set_global_default(builder.finish()).is_ok()
    };

    if installed {
        info!("AssetPipe v{} initialized with custom config", VERSION);
    }

    log_capabilities();
    Ok(())
}

fn log_filter(rust_log: Option<String>, level: &str) -> Result<EnvFilter> {
    if let Some(filter) = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return Ok(filter);
    }

    EnvFilter::try_new(level)
        .map_err(|e| AssetPipeError::config(format!("Invalid log level {:?}: {}", level, e)))
}

fn log_capabilities() {
    debug!("Detected {} logical CPUs", num_cpus::get());
    debug!(
        "Decoder support: JPEG {}, PNG {}, WebP {}",
        image::ImageFormat::Jpeg.can_read(),
        image::ImageFormat::Png.can_read(),
        image::ImageFormat::WebP.can_read()
    );
}
