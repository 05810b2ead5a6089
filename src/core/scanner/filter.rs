//! Which files the scanner keeps.

use super::ImageFormat;
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "gif"];

/// Extension and visibility filter for frame files
#[derive(Debug, Clone)]
pub struct ImageFilter {
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl ImageFilter {
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }

    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Restrict to these extensions; entries are matched case-insensitively
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with('.'))
    }

    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && Self::is_hidden(path) {
            return false;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.contains(&ext.to_lowercase()) && ImageFormat::from_extension(ext).is_supported()
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_supported_images() {
        let filter = ImageFilter::new();
        assert!(filter.should_include(Path::new("/captures/frame.JPG")));
        assert!(filter.should_include(Path::new("/captures/frame.webp")));
        assert!(!filter.should_include(Path::new("/captures/notes.txt")));
        assert!(!filter.should_include(Path::new("/captures/frame")));
    }

    #[test]
    fn hidden_files_need_opt_in() {
        assert!(!ImageFilter::new().should_include(Path::new("/captures/.frame.png")));
        assert!(ImageFilter::new()
            .with_hidden(true)
            .should_include(Path::new("/captures/.frame.png")));
    }

    #[test]
    fn custom_extensions_still_require_a_decoder() {
        let filter = ImageFilter::new().with_extensions(vec!["PNG".into(), "heic".into()]);
        assert!(filter.should_include(Path::new("a.png")));
        assert!(!filter.should_include(Path::new("a.jpg")));
        assert!(!filter.should_include(Path::new("a.heic")));
    }
}
