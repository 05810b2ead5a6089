//! Decoding frame files into grayscale buffers.
//!
//! JPEG goes through zune-jpeg straight to luma; everything else, and any
//! JPEG zune-jpeg rejects, goes through the image crate. Large frames are
//! downscaled with fast_image_resize before hashing.

use super::super::hasher::GrayscaleImage;
use super::super::scanner::ImageFormat;
use crate::error::HashError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Longest side kept after decoding
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Decodes and downsizes frames; holds a reusable resizer
pub struct FrameDecoder {
    resizer: Resizer,
    max_dimension: u32,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    /// Read a file into a luma frame no larger than the configured bound
    pub fn decode(&mut self, path: &Path) -> Result<GrayscaleImage, HashError> {
        let gray = match ImageFormat::from_path(path) {
            ImageFormat::Jpeg => decode_jpeg(path).or_else(|_| decode_fallback(path))?,
            _ => decode_fallback(path)?,
        };
        if gray.is_empty() {
            return Err(HashError::EmptyImage {
                path: path.to_path_buf(),
            });
        }
        self.downscale(gray).map_err(|reason| HashError::DecodeError {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Shrink so the longest side fits, keeping the aspect ratio
    pub fn downscale(&mut self, gray: GrayscaleImage) -> Result<GrayscaleImage, String> {
        let (width, height) = (gray.width(), gray.height());
        let longest = width.max(height);
        if longest <= self.max_dimension {
            return Ok(gray);
        }
        let scale = self.max_dimension as f64 / longest as f64;
        let dst_width = ((width as f64 * scale).round() as u32).max(1);
        let dst_height = ((height as f64 * scale).round() as u32).max(1);

        let src = Image::from_vec_u8(width, height, gray.into_raw(), PixelType::U8)
            .map_err(|e| format!("invalid source buffer: {e}"))?;
        let mut dst = Image::new(dst_width, dst_height, PixelType::U8);
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
        self.resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| format!("resize failed: {e}"))?;

        GrayscaleImage::new(dst_width, dst_height, dst.into_vec())
            .ok_or_else(|| "resized buffer has the wrong size".to_string())
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_jpeg(path: &Path) -> Result<GrayscaleImage, HashError> {
    let bytes = fs::read(path).map_err(|source| HashError::IoError {
        path: path.to_path_buf(),
        source,
    })?;

    let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::Luma);
    let mut decoder = JpegDecoder::new_with_options(&bytes, options);
    let pixels = decoder.decode().map_err(|e| HashError::DecodeError {
        path: path.to_path_buf(),
        reason: format!("zune-jpeg decode failed: {e:?}"),
    })?;
    let info = decoder.info().ok_or_else(|| HashError::DecodeError {
        path: path.to_path_buf(),
        reason: "missing JPEG header info".to_string(),
    })?;

    if decoder.get_output_colorspace() != Some(ColorSpace::Luma) {
        return Err(HashError::DecodeError {
            path: path.to_path_buf(),
            reason: "decoder ignored luma output".to_string(),
        });
    }
    GrayscaleImage::new(info.width as u32, info.height as u32, pixels).ok_or_else(|| HashError::DecodeError {
        path: path.to_path_buf(),
        reason: "luma buffer has the wrong size".to_string(),
    })
}

fn decode_fallback(path: &Path) -> Result<GrayscaleImage, HashError> {
    let image = image::open(path).map_err(|e| HashError::DecodeError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(GrayscaleImage::from(&image.to_luma8()))
}
