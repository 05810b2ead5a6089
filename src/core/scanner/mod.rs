//! # Scanner Module
//!
//! Finds frame images on disk for batch identification and catalog builds.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg), decoded with zune-jpeg
//! - PNG, WebP, BMP, TIFF, GIF, decoded with the image crate
//!
//! ## Example
//! ```rust,ignore
//! use card_scan::core::scanner::{FrameScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let found = scanner.scan(&["./captures".into()])?;
//! ```

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An image file that can be decoded into a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFile {
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    pub format: ImageFormat,
}

/// Image formats the frame decoder accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Bmp,
    Tiff,
    Gif,
    Unknown,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "webp" => ImageFormat::WebP,
            "bmp" => ImageFormat::Bmp,
            "tiff" | "tif" => ImageFormat::Tiff,
            "gif" => ImageFormat::Gif,
            _ => ImageFormat::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(ImageFormat::from_extension)
            .unwrap_or(ImageFormat::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ImageFormat::Unknown)
    }
}

/// Files found plus the non-fatal errors met along the way
#[derive(Debug, Default)]
pub struct FrameDiscovery {
    pub frames: Vec<FrameFile>,
    pub errors: Vec<ScanError>,
}

/// Source of frame files; tests can supply their own
pub trait FrameScanner: Send + Sync {
    /// Each path may be a single image or a directory to walk
    fn scan(&self, paths: &[PathBuf]) -> Result<FrameDiscovery, ScanError>;
}
