//! # Card Scan
//!
//! Identifies trading cards in camera frames by matching perceptual
//! fingerprints against a local catalog.
//!
//! ## Core Philosophy
//! - **Fingerprints first** - text recognition is a costly fallback
//! - **Never guess** - near ties become an explicit ambiguous result for
//!   the user to settle
//! - **Never crash the loop** - every recognition path returns a result
//!
//! ## Architecture
//! The library is split into a core engine and presentation layers:
//! - `core` - fingerprinting, catalog, resolution and the scan loop
//! - `events` - decision and progress events over channels
//! - `error` - typed errors with context
//! - `cli` - command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

pub use error::{CardScanError, Result};

/// Install a `tracing` subscriber driven by `RUST_LOG`.
///
/// Only the binary calls this; embedding applications bring their own.
/// `verbose` raises the default level when `RUST_LOG` is unset.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "card_scan=debug" } else { "card_scan=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
