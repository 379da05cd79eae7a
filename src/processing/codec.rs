//! Codec service: decoding, compression and WebP re-encoding
//!
//! The pipeline only talks to the [`CodecService`] trait. [`ImageCodec`] is
//! the stock implementation on top of the `image` crate. Every write goes
//! through a temporary file in the destination directory that is renamed
//! into place, so an interrupted run never leaves a truncated output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat};
use tracing::debug;

use crate::config::{PngQualityRange, ProcessingConfig};
use crate::error::{AssetPipeError, ErrorContext, Result};
use crate::processing::planner::CompressSettings;
use crate::processing::resize::ImageResizer;

/// Image operations the pipeline needs, one call per variant
///
/// Implementations must be safe to call from several worker threads at once.
/// Each method returns the number of bytes written to `output`.
pub trait CodecService: Send + Sync {
    /// Re-encode `input` in its own format with the given settings
    fn compress(&self, input: &Path, output: &Path, settings: &CompressSettings) -> Result<u64>;

    /// Resize `input` to `width` and encode it as WebP
    fn resize_reencode(&self, input: &Path, output: &Path, width: u32) -> Result<u64>;
}

/// `image`-crate backed codec
#[derive(Debug, Clone, Default)]
pub struct ImageCodec {
    resizer: ImageResizer,
}

impl ImageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a codec from processing settings
    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            resizer: ImageResizer::with_filter(config.resize_filter)
                .without_enlargement(config.without_enlargement),
        }
    }

    /// Decode an image, sniffing the real format from its header
    fn load_image(&self, path: &Path) -> Result<(DynamicImage, ImageFormat)> {
        debug!("Loading image: {:?}", path);

        let reader = image::io::Reader::open(path)
            .with_file_context(path.to_path_buf())?
            .with_guessed_format()
            .with_file_context(path.to_path_buf())?;

        let Some(format) = reader.format() else {
            return Err(AssetPipeError::unsupported_format("unrecognized content", Some(path.to_path_buf())));
        };

        let image = reader.decode().with_file_context(path.to_path_buf())?;

        debug!("Loaded image: {}x{} ({:?}, {:?})", image.width(), image.height(), format, image.color());
        Ok((image, format))
    }
}

impl CodecService for ImageCodec {
    fn compress(&self, input: &Path, output: &Path, settings: &CompressSettings) -> Result<u64> {
        let (image, detected) = self.load_image(input)?;
        if detected != ImageFormat::from(settings.format()) {
            debug!("{:?} holds {:?} data, re-encoding as {}", input, detected, settings.format());
        }

        let written = match *settings {
            CompressSettings::Jpeg { quality } => write_atomic(output, |w| {
                let rgb = image.to_rgb8();
                JpegEncoder::new_with_quality(w, quality)
                    .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
                    .map_err(Into::into)
            }),
            CompressSettings::Png { quality } => write_atomic(output, |w| {
                let (buf, color) = quantize(&image, quality);
                PngEncoder::new_with_quality(w, CompressionType::Best, PngFilter::Adaptive)
                    .write_image(&buf, image.width(), image.height(), color)
                    .map_err(Into::into)
            }),
        };

        written.with_file_context(output.to_path_buf())
    }

    fn resize_reencode(&self, input: &Path, output: &Path, width: u32) -> Result<u64> {
        if width == 0 {
            return Err(AssetPipeError::invalid_parameters("Target width must be positive"));
        }

        let (image, _) = self.load_image(input)?;
        let resized = self.resizer.resize_to_width(&image, width);

        write_atomic(output, |w| {
            let (buf, color) = if resized.color().has_alpha() {
                (resized.to_rgba8().into_raw(), ColorType::Rgba8)
            } else {
                (resized.to_rgb8().into_raw(), ColorType::Rgb8)
            };

            WebPEncoder::new_lossless(w)
                .write_image(&buf, resized.width(), resized.height(), color)
                .map_err(Into::into)
        })
        .with_file_context(output.to_path_buf())
    }
}

/// Reduce every color channel to the bit depth allowed by `quality`
///
/// Alpha is left untouched. Fewer distinct levels per channel is what lets
/// the PNG deflate stage shrink the file.
fn quantize(image: &DynamicImage, quality: PngQualityRange) -> (Vec<u8>, ColorType) {
    let bits = quality.channel_bits();
    let shift = 8 - u32::from(bits);
    let reduce = |v: u8| if shift == 0 { v } else { (v >> shift) << shift };

    if image.color().has_alpha() {
        let mut rgba = image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            for channel in &mut pixel.0[..3] {
                *channel = reduce(*channel);
            }
        }
        (rgba.into_raw(), ColorType::Rgba8)
    } else {
        let mut rgb = image.to_rgb8();
        for value in rgb.iter_mut() {
            *value = reduce(*value);
        }
        (rgb.into_raw(), ColorType::Rgb8)
    }
}

/// Write through a sibling temp file and rename it over `output`
fn write_atomic<F>(output: &Path, encode: F) -> Result<u64>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut builder = tempfile::Builder::new();
    builder.prefix(".assetpipe-").suffix(".tmp");

    // Temp files default to 0600; outputs get the usual umask-filtered mode
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    let mut temp = builder.tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        encode(&mut writer)?;
        writer.flush()?;
    }

    temp.persist(output).map_err(|e| AssetPipeError::IoError(e.error))?;

    let size = std::fs::metadata(output)?.len();
    debug!("Wrote {:?} ({} bytes)", output, size);
    Ok(size)
}
