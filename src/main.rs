//! AssetPipe CLI - Batch Image-Asset Pipeline
//!
//! Mirrors a source image tree into an output tree with an optimized copy of
//! every image plus one resized WebP per breakpoint.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use assetpipe::parallel::PlannedTask;
use assetpipe::processing::PlanDecision;
use assetpipe::{
    init_with_config, AssetPipeError, BreakpointSpec, Config, Pipeline, PngQualityRange, ProgressTracker,
    RunSummary,
};

/// AssetPipe - Batch Image-Asset Pipeline
#[derive(Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Optimize an image tree and generate responsive WebP breakpoints",
    long_about = "AssetPipe walks an input image tree and mirrors it into an output tree. \
                  Every JPEG and PNG gets an optimized copy in its own format plus one resized \
                  WebP per breakpoint, named <base>-<breakpoint>.webp. Other files are skipped."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input image root [default: assets/img/]
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output root [default: dist/assets/img/]
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Breakpoint as NAME=WIDTH, repeatable (replaces the configured list)
    #[arg(short, long = "breakpoint", value_name = "NAME=WIDTH")]
    breakpoints: Vec<BreakpointSpec>,

    /// JPEG quality for optimized originals (1-100)
    #[arg(long, value_name = "QUALITY")]
    jpeg_quality: Option<u8>,

    /// PNG quality band for optimized originals, e.g. 0.6-0.8
    #[arg(long, value_name = "MIN-MAX")]
    png_quality: Option<PngQualityRange>,

    /// Number of worker threads (default: auto-detect)
    #[arg(short, long, value_name = "COUNT")]
    threads: Option<usize>,

    /// Do not follow symbolic links while walking the input tree
    #[arg(long)]
    no_follow_symlinks: bool,

    /// Never upscale a source narrower than a breakpoint
    #[arg(long)]
    without_enlargement: bool,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show what would be written without touching the output tree
    #[arg(long)]
    dry_run: bool,

    /// Print the summary (or plan) as JSON
    #[arg(long)]
    json: bool,

    /// Exit non-zero when any file failed
    #[arg(long)]
    strict: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// List every output that a run would write, without writing it
    Plan,
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "assetpipe.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Plan) => run_plan(&cli),
        Some(Commands::ValidateConfig { file }) => validate_config_file(file),
        Some(Commands::ExampleConfig { output, yaml }) => generate_example_config(output, *yaml),
        None if cli.dry_run => run_plan(&cli),
        None => run_pipeline(&cli).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", style("Error").red().bold(), error_text(&e));
            process::exit(1);
        }
    }
}

/// Bare pipeline errors get their user-facing wording; anything carrying
/// extra context prints the whole chain
fn error_text(e: &anyhow::Error) -> String {
    match e.downcast_ref::<AssetPipeError>() {
        Some(err) if e.chain().count() == 1 => err.user_message(),
        _ => format!("{:#}", e),
    }
}

/// Merge the config file, defaults and command line flags
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(input) = &cli.input {
        config.input_folder = input.clone();
    }
    if let Some(output) = &cli.output {
        config.output_folder = output.clone();
    }
    if !cli.breakpoints.is_empty() {
        config.breakpoints = cli.breakpoints.clone();
    }
    if let Some(quality) = cli.jpeg_quality {
        config.jpeg_quality = quality;
    }
    if let Some(range) = cli.png_quality {
        config.png_quality = range;
    }
    if let Some(threads) = cli.threads {
        config.processing.threads = Some(threads);
    }
    if cli.no_follow_symlinks {
        config.processing.follow_symlinks = false;
    }
    if cli.without_enlargement {
        config.processing.without_enlargement = true;
    }

    if cli.quiet {
        config.logging.level = "error".to_string();
    } else if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Process the tree; `Ok(false)` means the run should exit non-zero
async fn run_pipeline(cli: &Cli) -> Result<bool> {
    let config = build_config(cli)?;
    init_with_config(&config)?;

    info!("Input: {:?}", config.input_folder);
    info!("Output: {:?}", config.output_folder);
    debug!("Breakpoints: {:?}", config.breakpoints);

    let progress = if !cli.json && !cli.quiet {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} \
                     ({per_sec}, {eta}) {prefix}\n  {msg}",
                )?
                .progress_chars("#>-"),
        );
        ProgressTracker::with_bar(pb)
    } else {
        ProgressTracker::new()
    };

    let pipeline = Pipeline::new(config)?.with_progress(Arc::new(progress));

    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing files already in progress");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let summary = tokio::task::spawn_blocking(move || pipeline.run())
        .await
        .context("Pipeline worker panicked")??;

    print_summary(&summary, cli.json)?;
    Ok(!summary.is_failure(cli.strict))
}

/// Dry run: list planned outputs and skips
fn run_plan(cli: &Cli) -> Result<bool> {
    let config = build_config(cli)?;
    init_with_config(&config)?;

    let pipeline = Pipeline::new(config)?;
    let planned = pipeline.plan()?;

    if cli.json {
        let entries: Vec<_> = planned.iter().map(plan_entry_json).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(true);
    }

    let mut outputs = 0;
    let mut skipped = 0;
    let mut collisions = 0;

    for entry in &planned {
        let relative = entry.task.relative_path().display();
        match &entry.decision {
            PlanDecision::Skip { reason } => {
                skipped += 1;
                println!("{} {} ({})", style("skip").dim(), relative, reason);
            }
            PlanDecision::Process(_) => {
                println!("{}", style(relative).bold());
                for (variant, claimed_by) in entry.variants().iter().zip(&entry.collisions) {
                    match claimed_by {
                        Some(owner) => {
                            collisions += 1;
                            println!(
                                "  {:>10} {} {}",
                                variant.kind.label(),
                                variant.output_path.display(),
                                style(format!("(collides with {})", owner.display())).red()
                            );
                        }
                        None => {
                            outputs += 1;
                            println!("  {:>10} {}", variant.kind.label(), variant.output_path.display());
                        }
                    }
                }
            }
        }
    }

    println!();
    println!(
        "{} files: {} outputs would be written, {} skipped, {} collisions",
        planned.len(),
        style(outputs).green(),
        skipped,
        style(collisions).red()
    );

    Ok(true)
}

fn plan_entry_json(entry: &PlannedTask) -> serde_json::Value {
    match &entry.decision {
        PlanDecision::Skip { reason } => serde_json::json!({
            "path": entry.task.relative_path(),
            "skipped": reason,
        }),
        PlanDecision::Process(_) => {
            let variants: Vec<_> = entry
                .variants()
                .iter()
                .zip(&entry.collisions)
                .map(|(variant, claimed_by)| {
                    serde_json::json!({
                        "variant": variant.kind.label(),
                        "output_path": variant.output_path,
                        "kind": variant.kind,
                        "collides_with": claimed_by,
                    })
                })
                .collect();

            serde_json::json!({
                "path": entry.task.relative_path(),
                "variants": variants,
            })
        }
    }
}

/// Validate configuration file
fn validate_config_file(file_path: &Path) -> Result<bool> {
    let config = Config::from_file(file_path)?;
    config.validate()?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!("Input: {}", config.input_folder.display());
    println!("Output: {}", config.output_folder.display());
    println!("Breakpoints: {}", config.breakpoints.len());
    for breakpoint in &config.breakpoints {
        println!("  {} = {}px", style(&breakpoint.name).cyan(), breakpoint.width);
    }

    Ok(true)
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path, use_yaml: bool) -> Result<bool> {
    let output_path = if use_yaml {
        output_path.with_extension("yaml")
    } else {
        output_path.to_path_buf()
    };

    Config::default().to_file(&output_path)?;

    let format = if use_yaml { "YAML" } else { "TOML" };
    println!(
        "{}: Generated example {} configuration: {}",
        style("Success").green().bold(),
        format,
        output_path.display()
    );

    Ok(true)
}

/// Print processing summary
fn print_summary(summary: &RunSummary, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!();
    println!("{}", style("Processing Summary:").bold());
    println!("  {}: {}", style("Succeeded").green(), summary.succeeded);
    println!("  {}: {}", style("Skipped").yellow(), summary.skipped);
    println!("  {}: {}", style("Failed").red(), summary.failed);
    println!("  {}: {:.2}s", style("Duration").blue(), summary.elapsed_secs);

    if summary.succeeded > 0 {
        println!(
            "  {}: {:.2}MB in, {:.2}MB written",
            style("Size").cyan(),
            summary.input_bytes as f64 / 1024.0 / 1024.0,
            summary.output_bytes as f64 / 1024.0 / 1024.0
        );
    }

    if summary.failed > 0 {
        println!();
        println!("{}", style("Failures:").red().bold());
        for outcome in summary.failures() {
            println!("  {}", outcome);
        }
    }

    println!();
    println!("{}", summary.summary_line());
    Ok(())
}
