//! Event types emitted by the scan loop and the catalog indexer.

use crate::core::result::{MatchedBy, ScanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All events emitted by the core library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum Event {
    Cycle(CycleEvent),
    Index(IndexEvent),
}

/// Scan loop lifecycle.
///
/// `Navigated` is emitted at most once per stable match; the loop stops
/// scheduling cycles until it is resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleEvent {
    SessionStarted { session_id: Uuid },
    CycleStarted { cycle: u64 },
    CycleDecided { cycle: u64, result: ScanResult },
    /// A match was stable long enough to open the card
    Navigated {
        card_id: String,
        matched_by: MatchedBy,
        confidence: f64,
    },
    /// Several cards fit; waiting for the user to pick one
    AmbiguousPaused { result: ScanResult },
    /// Short user-facing guidance after a failed cycle
    Hint { message: String },
    /// A stuck cycle was abandoned by the watchdog
    Recovered { cycle: u64, reason: String },
    Paused,
    Resumed,
}

/// Catalog build progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexEvent {
    Started { total: usize },
    Progress(IndexProgress),
    CardFailed { card_id: String, message: String },
    Completed(IndexCompleted),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexProgress {
    pub completed: usize,
    pub total: usize,
    /// Card currently being fingerprinted
    pub current_card: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCompleted {
    pub cards: usize,
    pub fingerprints: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl From<CycleEvent> for Event {
    fn from(event: CycleEvent) -> Self {
        Event::Cycle(event)
    }
}

impl From<IndexEvent> for Event {
    fn from(event: IndexEvent) -> Self {
        Event::Index(event)
    }
}
