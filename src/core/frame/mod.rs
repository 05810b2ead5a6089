//! # Frame Module
//!
//! Where frames come from. The scan loop only sees the [`FrameSource`]
//! contract; a camera integration implements it on device, and
//! [`FileSequenceSource`] replays image files for the CLI and tests.

mod decode;

pub use decode::{FrameDecoder, DEFAULT_MAX_DIMENSION};

use crate::core::geometry::{FrameRect, RegionKind};
use crate::core::orchestrator::FrameInput;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Produces the frame for one scan cycle.
///
/// Called from a worker thread; a slow or failing capture only costs
/// the current cycle.
pub trait FrameSource: Send + Sync {
    fn capture(&self) -> Result<FrameInput, String>;
}

/// Always yields the same frame
#[derive(Debug, Clone)]
pub struct StillFrameSource {
    frame: FrameInput,
}

impl StillFrameSource {
    pub fn new(frame: FrameInput) -> Self {
        Self { frame }
    }
}

impl FrameSource for StillFrameSource {
    fn capture(&self) -> Result<FrameInput, String> {
        Ok(self.frame.clone())
    }
}

/// Replays image files in order, wrapping around at the end
pub struct FileSequenceSource {
    paths: Vec<PathBuf>,
    next: AtomicUsize,
    decoder: Mutex<FrameDecoder>,
    card_frame: Option<FrameRect>,
    region: RegionKind,
}

impl FileSequenceSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            next: AtomicUsize::new(0),
            decoder: Mutex::new(FrameDecoder::new()),
            card_frame: None,
            region: RegionKind::default(),
        }
    }

    pub fn card_frame(mut self, card_frame: Option<FrameRect>) -> Self {
        self.card_frame = card_frame;
        self
    }

    pub fn region(mut self, region: RegionKind) -> Self {
        self.region = region;
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for FileSequenceSource {
    fn capture(&self) -> Result<FrameInput, String> {
        if self.paths.is_empty() {
            return Err("no frames to replay".to_string());
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.paths.len();
        let path = &self.paths[index];
        debug!(path = %path.display(), "capturing frame");

        let image = {
            let mut decoder = self.decoder.lock().map_err(|_| "frame decoder poisoned".to_string())?;
            decoder.decode(path).map_err(|e| e.to_string())?
        };
        Ok(FrameInput {
            image: Some(Arc::new(image)),
            card_frame: self.card_frame,
            region: self.region,
        })
    }
}
