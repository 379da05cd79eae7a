//! Source format detection and the supported-extension allow-list

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Raster formats the pipeline optimizes in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
}

impl SourceFormat {
    /// Resolve a dotted, case-insensitive extension (`.JPG`, `.png`)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);

        if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") {
            Some(Self::Jpeg)
        } else if ext.eq_ignore_ascii_case("png") {
            Some(Self::Png)
        } else {
            None
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => f.write_str("JPEG"),
            Self::Png => f.write_str("PNG"),
        }
    }
}

/// Convert our SourceFormat to image crate format
impl From<SourceFormat> for image::ImageFormat {
    fn from(format: SourceFormat) -> Self {
        match format {
            SourceFormat::Jpeg => image::ImageFormat::Jpeg,
            SourceFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// Extension every resized variant is written with
pub const WEBP_EXTENSION: &str = "webp";

/// Get supported input extensions, dotted and lowercase
pub fn supported_extensions() -> &'static [&'static str] {
    &[".jpg", ".jpeg", ".png"]
}

/// Lowercased extension of a path including the leading dot, or "" when absent
pub fn dotted_extension<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
