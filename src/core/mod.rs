//! # Core Module
//!
//! The UI-agnostic recognition engine.
//!
//! ## Modules
//! - `hasher` - pHash/dHash fingerprints and hex helpers
//! - `geometry` - crop rectangles, jitter variants, blur gate, quad rectification
//! - `extractor` - frame to fingerprints, one per usable variant
//! - `catalog` - reference catalog contract plus in-memory and SQLite backends
//! - `resolver` - fingerprint to card decision ladder and edition hints
//! - `orchestrator` - edition fast path, fingerprints, text fallback, reconciliation
//! - `cycle` - the per-frame scan loop, its scheduler and session driver
//! - `frame` - frame sources and file decoding
//! - `scanner` - discovers frame images on disk
//! - `indexer` - builds the catalog from reference images
//! - `result` - the `ScanResult` handed to callers

pub mod catalog;
pub mod cycle;
pub mod extractor;
pub mod frame;
pub mod geometry;
pub mod hasher;
pub mod indexer;
pub mod orchestrator;
pub mod resolver;
pub mod result;
pub mod scanner;

// Re-export commonly used types
pub use catalog::{CatalogRepository, CatalogStore, InMemoryCatalog, SqliteCatalog};
pub use cycle::{CycleConfig, CycleDecision, ScanCycleController, ScanSession};
pub use hasher::{Fingerprint, GrayscaleImage};
pub use orchestrator::{FrameInput, ScanOrchestrator, ScanPolicy};
pub use resolver::{EditionHint, FingerprintResolver};
pub use result::{MatchedBy, NoneReason, ScanCandidate, ScanResult};
