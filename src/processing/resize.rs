//! Width-driven resizing for breakpoint variants

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Available resize filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Nearest neighbor (fastest, lowest quality)
    Nearest,
    /// Triangle (linear interpolation)
    Triangle,
    /// Catmull-Rom cubic spline
    CatmullRom,
    /// Gaussian blur
    Gaussian,
    /// Lanczos with radius 3 (high quality, recommended)
    #[default]
    Lanczos3,
}

impl From<FilterType> for image::imageops::FilterType {
    fn from(filter: FilterType) -> Self {
        match filter {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Triangle => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Gaussian => image::imageops::FilterType::Gaussian,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Resizes images to a breakpoint width, keeping the aspect ratio
#[derive(Debug, Clone, Copy)]
pub struct ImageResizer {
    filter: FilterType,
    without_enlargement: bool,
}

impl ImageResizer {
    /// Create a new resizer with default settings
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
            without_enlargement: false,
        }
    }

    /// Create a resizer with custom filter
    pub fn with_filter(filter: FilterType) -> Self {
        Self {
            filter,
            without_enlargement: false,
        }
    }

    /// Never upscale past the source width
    pub fn without_enlargement(mut self, enabled: bool) -> Self {
        self.without_enlargement = enabled;
        self
    }

    /// Dimensions an image of `width`x`height` gets at `target_width`
    pub fn target_dimensions(&self, width: u32, height: u32, target_width: u32) -> (u32, u32) {
        let target_width = if self.without_enlargement {
            target_width.min(width)
        } else {
            target_width
        }
        .max(1);

        let aspect_ratio = f64::from(height) / f64::from(width.max(1));
        let target_height = (f64::from(target_width) * aspect_ratio).round() as u32;

        (target_width, target_height.max(1))
    }

    /// Resize `image` to `target_width`
    pub fn resize_to_width(&self, image: &DynamicImage, target_width: u32) -> DynamicImage {
        let (width, height) = self.target_dimensions(image.width(), image.height(), target_width);

        if width == image.width() && height == image.height() {
            debug!("No resize needed, dimensions already match target");
            return image.clone();
        }

        debug!(
            "Resizing {}x{} -> {}x{} using {:?}",
            image.width(),
            image.height(),
            width,
            height,
            self.filter
        );

        image.resize_exact(width, height, self.filter.into())
    }
}

impl Default for ImageResizer {
    fn default() -> Self {
        Self::new()
    }
}
