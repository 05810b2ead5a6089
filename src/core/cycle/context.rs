//! Per-session mutable state owned by one controller.

use super::scheduler::TimerHandle;
use crate::core::result::ScanResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the scan loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    #[default]
    Idle,
    Capturing,
    Extracting,
    Resolving,
    Deciding,
    /// Same card seen, waiting for enough consecutive cycles
    Stabilizing,
    /// Several candidates; no capture until one is picked or scanning resumes
    AmbiguousWait,
    /// A card was opened; the loop is stopped
    Navigated,
    Paused,
}

impl CycleState {
    /// A cycle is between request and completion
    pub fn is_in_cycle(self) -> bool {
        matches!(
            self,
            CycleState::Capturing | CycleState::Extracting | CycleState::Resolving | CycleState::Deciding
        )
    }

    /// States in which ticks start new cycles
    pub fn accepts_ticks(self) -> bool {
        matches!(self, CycleState::Idle | CycleState::Stabilizing)
    }
}

/// Counts consecutive cycles that matched the same card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StableMatchTracker {
    card_id: Option<String>,
    consecutive: u32,
}

impl StableMatchTracker {
    /// Record a match; returns how many cycles in a row saw this card
    pub fn observe(&mut self, card_id: &str) -> u32 {
        if self.card_id.as_deref() == Some(card_id) {
            self.consecutive += 1;
        } else {
            self.card_id = Some(card_id.to_string());
            self.consecutive = 1;
        }
        self.consecutive
    }

    pub fn reset(&mut self) {
        self.card_id = None;
        self.consecutive = 0;
    }

    pub fn card_id(&self) -> Option<&str> {
        self.card_id.as_deref()
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// Everything that survives from one cycle to the next
#[derive(Debug, Clone)]
pub struct ScanSessionContext {
    pub session_id: Uuid,
    pub state: CycleState,
    pub tracker: StableMatchTracker,
    /// Consecutive cycles without a usable match
    pub miss_streak: u32,
    /// The cycle whose completion is awaited
    pub in_flight: Option<u64>,
    /// Result the user is choosing from while in `AmbiguousWait`
    pub pending_selection: Option<ScanResult>,
    pub(crate) next_cycle: u64,
    pub(crate) tick: Option<TimerHandle>,
    pub(crate) watchdog: Option<TimerHandle>,
    pub(crate) started: bool,
}

impl ScanSessionContext {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: CycleState::Idle,
            tracker: StableMatchTracker::default(),
            miss_streak: 0,
            in_flight: None,
            pending_selection: None,
            next_cycle: 1,
            tick: None,
            watchdog: None,
            started: false,
        }
    }

    /// Cycles started so far
    pub fn cycles_started(&self) -> u64 {
        self.next_cycle - 1
    }
}

impl Default for ScanSessionContext {
    fn default() -> Self {
        Self::new()
    }
}
