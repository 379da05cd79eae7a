//! Deciding which artifacts a source file produces

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::{validate_breakpoints, BreakpointSpec, Config, PngQualityRange};
use crate::error::Result;
use crate::processing::formats::{SourceFormat, WEBP_EXTENSION};
use crate::processing::paths::MappedPath;

/// Reason recorded for files outside the allow-list
pub const UNSUPPORTED_EXTENSION: &str = "unsupported extension";

/// Same-format compression parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum CompressSettings {
    Jpeg { quality: u8 },
    Png { quality: PngQualityRange },
}

impl CompressSettings {
    pub fn format(&self) -> SourceFormat {
        match self {
            Self::Jpeg { .. } => SourceFormat::Jpeg,
            Self::Png { .. } => SourceFormat::Png,
        }
    }
}

/// One artifact to derive from a source file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariantKind {
    OptimizedOriginal { settings: CompressSettings },
    ResizedWebp { breakpoint: String, width: u32 },
}

impl VariantKind {
    /// Short label used in logs and failure reports
    pub fn label(&self) -> &str {
        match self {
            Self::OptimizedOriginal { .. } => "optimized",
            Self::ResizedWebp { breakpoint, .. } => breakpoint.as_str(),
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OptimizedOriginal { settings } => write!(f, "optimized {}", settings.format()),
            Self::ResizedWebp { breakpoint, width } => write!(f, "{} ({}px WebP)", breakpoint, width),
        }
    }
}

/// A planned artifact with its destination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub output_path: PathBuf,
    pub kind: VariantKind,
}

/// Ordered artifacts for one file: optimized original first, then breakpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariantPlan {
    pub variants: Vec<Variant>,
}

impl VariantPlan {
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }
}

/// Planner verdict for one file
#[derive(Debug, Clone, PartialEq)]
pub enum PlanDecision {
    Process(VariantPlan),
    Skip { reason: String },
}

/// Pure planning step: variant kinds for an extension, or `None` to skip
pub fn plan_kinds(
    ext: &str,
    breakpoints: &[BreakpointSpec],
    jpeg_quality: u8,
    png_quality: PngQualityRange,
) -> Option<Vec<VariantKind>> {
    let settings = match SourceFormat::from_extension(ext)? {
        SourceFormat::Jpeg => CompressSettings::Jpeg { quality: jpeg_quality },
        SourceFormat::Png => CompressSettings::Png { quality: png_quality },
    };

    let mut kinds = Vec::with_capacity(breakpoints.len() + 1);
    kinds.push(VariantKind::OptimizedOriginal { settings });
    kinds.extend(breakpoints.iter().map(|bp| VariantKind::ResizedWebp {
        breakpoint: bp.name.clone(),
        width: bp.width,
    }));

    Some(kinds)
}

/// Plans variants against a validated, immutable breakpoint set
#[derive(Debug, Clone)]
pub struct VariantPlanner {
    breakpoints: Vec<BreakpointSpec>,
    jpeg_quality: u8,
    png_quality: PngQualityRange,
}

impl VariantPlanner {
    /// Build a planner from configuration, rejecting invalid breakpoints
    pub fn new(config: &Config) -> Result<Self> {
        validate_breakpoints(&config.breakpoints)?;

        Ok(Self {
            breakpoints: config.breakpoints.clone(),
            jpeg_quality: config.jpeg_quality,
            png_quality: config.png_quality,
        })
    }

    pub fn breakpoints(&self) -> &[BreakpointSpec] {
        &self.breakpoints
    }

    /// Plan the artifacts for one mapped source file
    pub fn plan(&self, mapped: &MappedPath) -> PlanDecision {
        let Some(kinds) = plan_kinds(
            &mapped.ext,
            &self.breakpoints,
            self.jpeg_quality,
            self.png_quality,
        ) else {
            return PlanDecision::Skip {
                reason: UNSUPPORTED_EXTENSION.to_string(),
            };
        };

        let variants = kinds
            .into_iter()
            .map(|kind| {
                let output_path = match &kind {
                    VariantKind::OptimizedOriginal { .. } => mapped.optimized_path(),
                    VariantKind::ResizedWebp { breakpoint, .. } => {
                        mapped.variant_path(breakpoint, WEBP_EXTENSION)
                    }
                };
                Variant { output_path, kind }
            })
            .collect();

        PlanDecision::Process(VariantPlan { variants })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetPipeError;
    use crate::processing::paths::map_path;
    use std::path::Path;

    fn planner(breakpoints: Vec<BreakpointSpec>) -> VariantPlanner {
        let config = Config {
            breakpoints,
            ..Config::default()
        };
        VariantPlanner::new(&config).unwrap()
    }

    #[test]
    fn test_plan_order_and_paths() {
        let planner = planner(vec![
            BreakpointSpec::new("mobile", 480),
            BreakpointSpec::new("desktop", 1920),
        ]);
        let mapped = map_path(
            Path::new("/in"),
            Path::new("/out"),
            Path::new("/in/a/b/photo.jpeg"),
        )
        .unwrap();

        let PlanDecision::Process(plan) = planner.plan(&mapped) else {
            panic!("expected a plan");
        };

        let paths: Vec<_> = plan.variants.iter().map(|v| v.output_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/out/a/b/photo.jpeg"),
                PathBuf::from("/out/a/b/photo-mobile.webp"),
                PathBuf::from("/out/a/b/photo-desktop.webp"),
            ]
        );
        assert_eq!(
            plan.variants[0].kind,
            VariantKind::OptimizedOriginal {
                settings: CompressSettings::Jpeg { quality: 75 }
            }
        );
        assert_eq!(plan.variants[2].kind.label(), "desktop");
    }

    #[test]
    fn test_png_gets_quality_range() {
        let kinds = plan_kinds(".PNG", &[], 75, PngQualityRange::new(0.6, 0.8)).unwrap();
        assert_eq!(
            kinds,
            vec![VariantKind::OptimizedOriginal {
                settings: CompressSettings::Png {
                    quality: PngQualityRange::new(0.6, 0.8)
                }
            }]
        );
    }

    #[test]
    fn test_unsupported_extension_is_skipped() {
        let planner = planner(crate::config::default_breakpoints());
        let mapped = map_path(Path::new("/in"), Path::new("/out"), Path::new("/in/readme.txt")).unwrap();

        assert_eq!(
            planner.plan(&mapped),
            PlanDecision::Skip {
                reason: UNSUPPORTED_EXTENSION.to_string()
            }
        );
        assert!(plan_kinds("", &[], 75, PngQualityRange::default()).is_none());
    }

    #[test]
    fn test_zero_width_is_a_config_error() {
        let config = Config {
            breakpoints: vec![BreakpointSpec::new("mobile", 0)],
            ..Config::default()
        };

        assert!(matches!(
            VariantPlanner::new(&config),
            Err(AssetPipeError::ConfigError { .. })
        ));
    }
}
