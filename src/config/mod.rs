//! Configuration management for AssetPipe

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, AssetPipeError};
use crate::processing::resize::FilterType;

pub mod breakpoints;
pub use breakpoints::*;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the source image tree
    pub input_folder: PathBuf,

    /// Root of the mirrored output tree
    pub output_folder: PathBuf,

    /// JPEG quality for optimized originals (1-100)
    pub jpeg_quality: u8,

    /// PNG quality band for optimized originals
    pub png_quality: PngQualityRange,

    /// Resized WebP variants, produced in this order
    pub breakpoints: Vec<BreakpointSpec>,

    /// Global processing settings
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from("assets/img/"),
            output_folder: PathBuf::from("dist/assets/img/"),
            jpeg_quality: 75,
            png_quality: PngQualityRange::default(),
            breakpoints: default_breakpoints(),
            processing: ProcessingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Global processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of worker threads (None = auto-detect)
    pub threads: Option<usize>,

    /// Follow symbolic links while walking the input tree
    pub follow_symlinks: bool,

    /// Keep the source width when a breakpoint is wider than the source
    pub without_enlargement: bool,

    /// Resampling filter for breakpoint variants
    pub resize_filter: FilterType,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threads: None, // Auto-detect
            follow_symlinks: true,
            without_enlargement: false,
            resize_filter: FilterType::default(),
        }
    }
}

impl ProcessingConfig {
    /// Worker count actually used for a run
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| AssetPipeError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(AssetPipeError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| AssetPipeError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| AssetPipeError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(AssetPipeError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| AssetPipeError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// Everything checked here is fatal: a run never starts with a bad
    /// breakpoint or quality setting.
    pub fn validate(&self) -> Result<()> {
        validate_breakpoints(&self.breakpoints)?;

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(AssetPipeError::config(format!(
                "JPEG quality must be between 1-100, got {}",
                self.jpeg_quality
            )));
        }

        self.png_quality.validate()?;

        if self.input_folder.as_os_str().is_empty() {
            return Err(AssetPipeError::config("Input folder must not be empty"));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(AssetPipeError::config("Output folder must not be empty"));
        }

        if let Some(threads) = self.processing.threads {
            if threads == 0 {
                return Err(AssetPipeError::config(
                    "Thread count must be greater than 0"
                ));
            }
        }

        Ok(())
    }

    /// Check the filesystem side of the configuration before a run
    ///
    /// The input root must be a readable directory and the output root must
    /// be creatable. The output root must not sit inside the input root,
    /// otherwise a second run would pick up its own output.
    pub fn validate_paths(&self) -> Result<()> {
        let metadata = std::fs::metadata(&self.input_folder).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssetPipeError::not_found(self.input_folder.clone())
            } else {
                AssetPipeError::config(format!(
                    "Cannot read input folder {:?}: {}",
                    self.input_folder, e
                ))
            }
        })?;

        if !metadata.is_dir() {
            return Err(AssetPipeError::config(format!(
                "Input folder {:?} is not a directory",
                self.input_folder
            )));
        }

        std::fs::read_dir(&self.input_folder).map_err(|e| {
            AssetPipeError::config(format!(
                "Cannot read input folder {:?}: {}",
                self.input_folder, e
            ))
        })?;

        let input = self.input_folder.canonicalize()?;
        let output = resolve_from_existing(&self.output_folder)?;
        if output.starts_with(&input) {
            return Err(AssetPipeError::config(format!(
                "Output folder {:?} must not be inside input folder {:?}",
                self.output_folder, self.input_folder
            )));
        }

        std::fs::create_dir_all(&self.output_folder).map_err(|e| {
            AssetPipeError::config(format!(
                "Cannot create output folder {:?}: {}",
                self.output_folder, e
            ))
        })?;

        Ok(())
    }
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the rest
fn resolve_from_existing(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
