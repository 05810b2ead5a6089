//! # Cycle Module
//!
//! The per-frame control loop: capture, extract, resolve, decide.
//!
//! ## Pieces
//! - [`ScanCycleController`] - state machine deciding when cycles run and
//!   what their results mean (stability gate, miss streak, ambiguity pause,
//!   watchdog recovery)
//! - [`Scheduler`] - timers behind a trait so the controller can be tested
//!   on a virtual clock ([`ManualScheduler`])
//! - [`ScanSession`] - drives a controller with a [`FrameSource`] and an
//!   orchestrator, enforcing per-phase timeouts
//!
//! ## Example
//! ```rust,ignore
//! let controller = ScanCycleController::new(CycleConfig::fingerprint(), SystemScheduler::new(), sender);
//! let mut session = ScanSession::new(controller, camera, Arc::new(orchestrator));
//! session.start();
//! if let Some(CycleDecision::Navigate { card_id, .. }) = session.run_until_settled(Duration::from_secs(30)) {
//!     open_card(&card_id);
//! }
//! ```
//!
//! [`FrameSource`]: crate::core::frame::FrameSource

mod context;
mod controller;
mod scheduler;
mod session;

pub use context::{CycleState, ScanSessionContext, StableMatchTracker};
pub use controller::{CycleConfig, CycleDecision, CycleRequest, ScanCycleController};
pub use scheduler::{ManualScheduler, Scheduler, SystemScheduler, TimerHandle, TimerTask};
pub use session::{ScanSession, MAX_OUTSTANDING_WORKERS};
