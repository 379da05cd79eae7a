//! Breakpoint and quality settings for responsive variants

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use crate::error::{Result, AssetPipeError};

/// Widest breakpoint we accept, matching the codec's dimension ceiling
pub const MAX_BREAKPOINT_WIDTH: u32 = 32768;

/// A named target width for one resized WebP variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointSpec {
    /// Suffix used in output names (`photo-<name>.webp`)
    pub name: String,

    /// Target width in pixels
    pub width: u32,
}

impl BreakpointSpec {
    pub fn new<S: Into<String>>(name: S, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }

    /// Validate a single breakpoint
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AssetPipeError::config("Breakpoint name must not be empty"));
        }

        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(AssetPipeError::config(format!(
                "Breakpoint name '{}' must not contain path separators",
                self.name
            )));
        }

        if self.width == 0 || self.width > MAX_BREAKPOINT_WIDTH {
            return Err(AssetPipeError::config(format!(
                "Breakpoint '{}' width must be between 1-{}, got {}",
                self.name, MAX_BREAKPOINT_WIDTH, self.width
            )));
        }

        Ok(())
    }
}

/// Parses the CLI form `name=width`
impl FromStr for BreakpointSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, width) = s
            .split_once('=')
            .ok_or_else(|| "Breakpoints must be in format 'NAME=WIDTH' (e.g., 'mobile=480')".to_string())?;

        let name = name.trim();
        if name.is_empty() {
            return Err("Breakpoint name must not be empty".to_string());
        }

        // Parse as signed so a negative width reports as out of range rather than garbage
        let width = width
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("Invalid width value '{}'", width.trim()))?;

        if width <= 0 || width > i64::from(MAX_BREAKPOINT_WIDTH) {
            return Err(format!(
                "Breakpoint width must be between 1-{}, got {}",
                MAX_BREAKPOINT_WIDTH, width
            ));
        }

        Ok(Self::new(name, width as u32))
    }
}

/// Validate an ordered breakpoint list
pub fn validate_breakpoints(breakpoints: &[BreakpointSpec]) -> Result<()> {
    for (index, breakpoint) in breakpoints.iter().enumerate() {
        breakpoint.validate()?;

        // Duplicate names would make two variants share one output file
        if breakpoints[..index].iter().any(|b| b.name == breakpoint.name) {
            return Err(AssetPipeError::config(format!(
                "Duplicate breakpoint name '{}'",
                breakpoint.name
            )));
        }
    }

    Ok(())
}

/// The stock breakpoint set: mobile, laptop and desktop
pub fn default_breakpoints() -> Vec<BreakpointSpec> {
    vec![
        BreakpointSpec::new("mobile", 480),
        BreakpointSpec::new("laptop", 1024),
        BreakpointSpec::new("desktop", 1920),
    ]
}

/// Acceptable PNG quality band, each bound in 0.0-1.0
///
/// The upper bound decides how many bits per channel survive quantization.
/// The lower bound only has to be consistent with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PngQualityRange {
    pub min: f32,
    pub max: f32,
}

impl PngQualityRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);

        if !in_unit(self.min) || !in_unit(self.max) {
            return Err(AssetPipeError::config(format!(
                "PNG quality bounds must be within 0.0-1.0, got [{}, {}]",
                self.min, self.max
            )));
        }

        if self.min > self.max {
            return Err(AssetPipeError::config(format!(
                "PNG quality minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }

        Ok(())
    }

    /// Bits per channel kept when quantizing, derived from the band
    pub fn channel_bits(&self) -> u8 {
        ((self.max * 8.0).ceil() as u8).clamp(1, 8)
    }
}

impl Default for PngQualityRange {
    fn default() -> Self {
        Self { min: 0.6, max: 0.8 }
    }
}

/// Parses the CLI form `min-max` (e.g. `0.6-0.8`)
impl FromStr for PngQualityRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| "PNG quality must be in format 'MIN-MAX' (e.g., '0.6-0.8')".to_string())?;

        let min = min
            .trim()
            .parse::<f32>()
            .map_err(|_| format!("Invalid minimum quality '{}'", min.trim()))?;
        let max = max
            .trim()
            .parse::<f32>()
            .map_err(|_| format!("Invalid maximum quality '{}'", max.trim()))?;

        let range = Self { min, max };
        range.validate().map_err(|e| e.to_string())?;
        Ok(range)
    }
}
