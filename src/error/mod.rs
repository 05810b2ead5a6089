//! # Error Module
//!
//! Error types for the card scanner.
//!
//! ## Design Principles
//! - **Never panic** on camera or catalog data - return errors instead
//! - **Include context** - paths, set codes, timeouts
//! - Recognition entry points never surface these; they fold them into
//!   a `ScanResult::None` with a reason code

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CardScanError {
    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Scan cycle error: {0}")]
    Cycle(#[from] CycleError),

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while discovering image files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while loading a frame from disk
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by catalog backends
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to open catalog database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Catalog query failed: {0}")]
    QueryFailed(String),

    #[error("Catalog corruption detected at {path}. Rebuild the catalog and try again.")]
    Corrupted { path: PathBuf },

    #[error("Invalid catalog manifest: {0}")]
    InvalidManifest(String),
}

/// Errors that end a single scan cycle without a decision.
///
/// All of these are recoverable: the next cycle simply tries again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("Camera capture timed out after {}ms", .timeout.as_millis())]
    CaptureTimeout { timeout: Duration },

    #[error("Card recognition timed out after {}ms", .timeout.as_millis())]
    ResolveTimeout { timeout: Duration },

    #[error("Camera capture failed: {0}")]
    CaptureFailed(String),

    #[error("Scan cycle {cycle} never completed and was reset")]
    Stuck { cycle: u64 },

    #[error("Scan worker stopped unexpectedly")]
    WorkerDisconnected,

    #[error("{outstanding} scan workers are still running")]
    WorkersExhausted { outstanding: usize },

    #[error("Scan was cancelled")]
    Cancelled,
}

impl CycleError {
    /// Short, non-technical hint shown to the user while scanning continues
    pub fn user_hint(&self) -> &'static str {
        match self {
            CycleError::CaptureTimeout { .. } | CycleError::CaptureFailed(_) => {
                "Camera is busy, hold steady"
            }
            CycleError::ResolveTimeout { .. } | CycleError::Stuck { .. } => {
                "Still looking, keep the card in frame"
            }
            CycleError::WorkerDisconnected | CycleError::WorkersExhausted { .. } => "Restarting scanner",
            CycleError::Cancelled => "Scanning paused",
        }
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CardScanError>;
