//! # Events Module
//!
//! Progress and lifecycle events for whatever drives the library.
//!
//! The scan loop reports cycle decisions, navigation and recovery; the
//! catalog indexer reports build progress. Both emit through an
//! [`EventSender`] and never block on a slow or absent listener.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//! let mut controller = ScanCycleController::new(CycleConfig::fingerprint(), SystemScheduler::new(), sender);
//! controller.start();
//!
//! for event in receiver.iter() {
//!     if let Event::Cycle(CycleEvent::Navigated { card_id, .. }) = event {
//!         println!("open {card_id}");
//!     }
//! }
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
