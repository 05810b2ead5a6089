//! Directory walking with walkdir.

use super::{filter::ImageFilter, FrameDiscovery, FrameFile, FrameScanner, ImageFormat};
use crate::error::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub follow_symlinks: bool,
    /// Include hidden files and descend into hidden directories
    pub include_hidden: bool,
    /// `None` walks the whole tree
    pub max_depth: Option<usize>,
    /// Replaces the default extension list
    pub extensions: Option<Vec<String>>,
}

pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);
        if let Some(extensions) = &config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }
        Self { config, filter }
    }

    fn frame_file(path: &Path) -> Result<FrameFile, ScanError> {
        let metadata = fs::metadata(path).map_err(|source| ScanError::ReadDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(FrameFile {
            path: path.to_path_buf(),
            size: metadata.len(),
            format: ImageFormat::from_path(path),
        })
    }

    fn walk(&self, root: &Path, found: &mut FrameDiscovery) {
        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let include_hidden = self.config.include_hidden;
        let entries = walker
            .into_iter()
            .filter_entry(|entry| include_hidden || entry.depth() == 0 || !ImageFilter::is_hidden(entry.path()));

        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_dir() || !self.filter.should_include(path) {
                        continue;
                    }
                    match Self::frame_file(path) {
                        Ok(frame) => found.frames.push(frame),
                        Err(error) => found.errors.push(error),
                    }
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = match e.io_error().map(|io| io.kind()) {
                        Some(std::io::ErrorKind::PermissionDenied) => ScanError::PermissionDenied { path },
                        _ => ScanError::ReadDirectory {
                            path,
                            source: std::io::Error::other(e.to_string()),
                        },
                    };
                    debug!(%error, "skipping unreadable entry");
                    found.errors.push(error);
                }
            }
        }
    }
}

impl FrameScanner for WalkDirScanner {
    fn scan(&self, paths: &[PathBuf]) -> Result<FrameDiscovery, ScanError> {
        let mut found = FrameDiscovery::default();
        for path in paths {
            if path.is_dir() {
                self.walk(path, &mut found);
            } else if path.is_file() {
                // Explicitly named files skip the hidden check
                if ImageFormat::from_path(path).is_supported() {
                    match Self::frame_file(path) {
                        Ok(frame) => found.frames.push(frame),
                        Err(error) => found.errors.push(error),
                    }
                }
            } else {
                found.errors.push(ScanError::NotFound { path: path.clone() });
            }
        }
        debug!(frames = found.frames.len(), errors = found.errors.len(), "scan finished");
        Ok(found)
    }
}
