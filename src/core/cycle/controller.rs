//! The scan loop state machine.
//!
//! The controller decides *when* a cycle runs and *what* its result means.
//! It never captures or recognizes anything itself: callers take a
//! [`CycleRequest`] from [`ScanCycleController::poll`], do the work, and
//! report back through [`ScanCycleController::complete_cycle`].

use super::context::{CycleState, ScanSessionContext};
use super::scheduler::{Scheduler, TimerTask};
use crate::core::orchestrator::ScanPolicy;
use crate::core::result::{MatchedBy, ScanResult};
use crate::error::CycleError;
use crate::events::{CycleEvent, EventSender};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Timing and gating for one scan loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,
    pub capture_timeout: Duration,
    /// Limit for extraction, resolution and reconciliation together
    pub resolve_timeout: Duration,
    /// Abandon a cycle that has not completed after this long
    pub watchdog_timeout: Duration,
    /// Consecutive matches needed for fingerprint-backed paths
    pub trusted_stable_count: u32,
    /// Consecutive matches needed for everything else
    pub stable_count: u32,
    /// Matches below this confidence count as misses
    pub min_stable_confidence: f64,
    /// Text fallback is allowed once this many cycles in a row missed
    pub ocr_after_misses: u32,
    pub allow_ocr: bool,
    pub read_footer: bool,
}

impl CycleConfig {
    /// Fast cadence for fingerprint-driven scanning
    pub fn fingerprint() -> Self {
        Self {
            interval: Duration::from_millis(400),
            capture_timeout: Duration::from_millis(2500),
            resolve_timeout: Duration::from_millis(4000),
            watchdog_timeout: Duration::from_millis(7500),
            trusted_stable_count: 1,
            stable_count: 2,
            min_stable_confidence: 0.6,
            ocr_after_misses: 1,
            allow_ocr: true,
            read_footer: true,
        }
    }

    /// Slower cadence when every cycle pays for text recognition
    pub fn text_only() -> Self {
        Self {
            interval: Duration::from_millis(1200),
            ocr_after_misses: 0,
            ..Self::fingerprint()
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeouts(mut self, capture: Duration, resolve: Duration) -> Self {
        self.capture_timeout = capture;
        self.resolve_timeout = resolve;
        self
    }

    pub fn watchdog_timeout(mut self, timeout: Duration) -> Self {
        self.watchdog_timeout = timeout;
        self
    }

    pub fn stable_counts(mut self, trusted: u32, other: u32) -> Self {
        self.trusted_stable_count = trusted;
        self.stable_count = other;
        self
    }

    pub fn min_stable_confidence(mut self, confidence: f64) -> Self {
        self.min_stable_confidence = confidence;
        self
    }

    pub fn allow_ocr(mut self, allowed: bool) -> Self {
        self.allow_ocr = allowed;
        self
    }

    /// Consecutive matches required before navigating
    pub fn required_stable_count(&self, matched_by: MatchedBy) -> u32 {
        let count = if matched_by.is_fingerprint_trusted() {
            self.trusted_stable_count
        } else {
            self.stable_count
        };
        count.max(1)
    }

    fn policy(&self, miss_streak: u32) -> ScanPolicy {
        ScanPolicy {
            allow_ocr_fallback: self.allow_ocr && miss_streak >= self.ocr_after_misses,
            read_footer: self.read_footer,
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::fingerprint()
    }
}

/// Work the caller should perform for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRequest {
    pub cycle: u64,
    pub policy: ScanPolicy,
}

/// What the controller made of a completed cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleDecision {
    /// Completion for a cycle that is no longer awaited
    Ignored,
    /// Transient failure; the next cycle retries
    Failed(CycleError),
    Miss,
    Stabilizing {
        card_id: String,
        count: u32,
        required: u32,
    },
    Navigate {
        card_id: String,
        matched_by: MatchedBy,
        confidence: f64,
    },
    /// Scanning stopped until a candidate is picked or scanning resumes
    AwaitSelection(ScanResult),
}

pub struct ScanCycleController<S: Scheduler> {
    config: CycleConfig,
    scheduler: S,
    context: ScanSessionContext,
    events: EventSender,
}

impl<S: Scheduler> ScanCycleController<S> {
    pub fn new(config: CycleConfig, scheduler: S, events: EventSender) -> Self {
        Self {
            config,
            scheduler,
            context: ScanSessionContext::new(),
            events,
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn context(&self) -> &ScanSessionContext {
        &self.context
    }

    pub fn state(&self) -> CycleState {
        self.context.state
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Begin the session; the first cycle is due immediately
    pub fn start(&mut self) {
        if self.context.started {
            return;
        }
        self.context.started = true;
        info!(session_id = %self.context.session_id, "scan session started");
        self.events.send(CycleEvent::SessionStarted {
            session_id: self.context.session_id,
        });
        self.schedule_tick(Duration::ZERO);
    }

    /// Process every due timer; returns the cycle to run, if one started
    pub fn poll(&mut self) -> Option<CycleRequest> {
        while let Some(task) = self.scheduler.pop_due() {
            if let Some(request) = self.handle_timer(task) {
                return Some(request);
            }
        }
        None
    }

    pub fn handle_timer(&mut self, task: TimerTask) -> Option<CycleRequest> {
        match task {
            TimerTask::Tick => {
                self.context.tick = None;
                self.begin_cycle()
            }
            TimerTask::Watchdog { cycle } => {
                self.recover(cycle);
                None
            }
        }
    }

    /// Record progress inside a running cycle. Returns `false` for cycles
    /// that are no longer awaited.
    pub fn enter_phase(&mut self, cycle: u64, state: CycleState) -> bool {
        if self.context.in_flight != Some(cycle) || !state.is_in_cycle() {
            return false;
        }
        trace!(cycle, ?state, "cycle phase");
        self.context.state = state;
        true
    }

    /// Hand in the outcome of a requested cycle
    pub fn complete_cycle(&mut self, cycle: u64, outcome: Result<ScanResult, CycleError>) -> CycleDecision {
        if self.context.in_flight != Some(cycle) {
            debug!(cycle, "ignoring completion of a cycle that is no longer awaited");
            return CycleDecision::Ignored;
        }
        self.context.in_flight = None;
        if let Some(watchdog) = self.context.watchdog.take() {
            self.scheduler.cancel(watchdog);
        }
        self.context.state = CycleState::Deciding;

        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                warn!(cycle, %error, "scan cycle failed");
                self.events.send(CycleEvent::Hint {
                    message: error.user_hint().to_string(),
                });
                self.record_miss();
                return CycleDecision::Failed(error);
            }
        };

        debug!(cycle, status = result.status(), matched_by = ?result.matched_by(), "cycle decided");
        self.events.send(CycleEvent::CycleDecided {
            cycle,
            result: result.clone(),
        });

        if let ScanResult::Matched {
            card_id,
            matched_by,
            confidence,
            ..
        } = &result
        {
            if *confidence >= self.config.min_stable_confidence {
                return self.stabilize(card_id.clone(), *matched_by, *confidence);
            }
        }
        if result.is_ambiguous() {
            return self.await_selection(result);
        }
        self.record_miss();
        CycleDecision::Miss
    }

    /// Pick one of the candidates offered while waiting on ambiguity
    pub fn select_candidate(&mut self, card_id: &str) -> Option<CycleDecision> {
        if self.context.state != CycleState::AmbiguousWait {
            return None;
        }
        let pending = self.context.pending_selection.as_ref()?;
        if !pending.candidates().iter().any(|c| c.card_id == card_id) {
            warn!(card_id, "selected card is not among the candidates");
            return None;
        }
        let matched_by = pending.matched_by().unwrap_or(MatchedBy::FingerprintAmbiguous);
        let confidence = pending.confidence();
        Some(self.navigate(card_id.to_string(), matched_by, confidence))
    }

    /// Leave a paused, ambiguous or navigated state and scan again
    pub fn resume(&mut self) -> bool {
        if !matches!(
            self.context.state,
            CycleState::Paused | CycleState::AmbiguousWait | CycleState::Navigated
        ) {
            return false;
        }
        self.context.state = CycleState::Idle;
        self.context.pending_selection = None;
        self.context.tracker.reset();
        self.context.miss_streak = 0;
        debug!(session_id = %self.context.session_id, "scanning resumed");
        self.events.send(CycleEvent::Resumed);
        self.schedule_tick(Duration::ZERO);
        true
    }

    /// Stop scanning; an in-flight cycle is abandoned, not awaited
    pub fn pause(&mut self) {
        if self.context.state == CycleState::Paused {
            return;
        }
        self.cancel_timers();
        if let Some(cycle) = self.context.in_flight.take() {
            debug!(cycle, "abandoning in-flight cycle on pause");
        }
        self.context.pending_selection = None;
        self.context.state = CycleState::Paused;
        self.events.send(CycleEvent::Paused);
    }

    fn begin_cycle(&mut self) -> Option<CycleRequest> {
        if self.context.in_flight.is_some() {
            trace!("previous cycle still in flight");
            self.schedule_tick(self.config.interval);
            return None;
        }
        if !self.context.state.accepts_ticks() {
            trace!(state = ?self.context.state, "tick ignored");
            return None;
        }

        let cycle = self.context.next_cycle;
        self.context.next_cycle += 1;
        self.context.in_flight = Some(cycle);
        self.context.state = CycleState::Capturing;
        self.context.watchdog = Some(
            self.scheduler
                .schedule(self.config.watchdog_timeout, TimerTask::Watchdog { cycle }),
        );
        self.events.send(CycleEvent::CycleStarted { cycle });

        Some(CycleRequest {
            cycle,
            policy: self.config.policy(self.context.miss_streak),
        })
    }

    fn recover(&mut self, cycle: u64) {
        self.context.watchdog = None;
        if self.context.in_flight != Some(cycle) {
            return;
        }
        let error = CycleError::Stuck { cycle };
        warn!(cycle, "watchdog reset a stuck scan cycle");
        self.context.in_flight = None;
        self.events.send(CycleEvent::Recovered {
            cycle,
            reason: error.to_string(),
        });
        self.events.send(CycleEvent::Hint {
            message: error.user_hint().to_string(),
        });
        self.record_miss();
    }

    fn stabilize(&mut self, card_id: String, matched_by: MatchedBy, confidence: f64) -> CycleDecision {
        self.context.miss_streak = 0;
        let count = self.context.tracker.observe(&card_id);
        let required = self.config.required_stable_count(matched_by);
        if count >= required {
            return self.navigate(card_id, matched_by, confidence);
        }
        debug!(card_id = %card_id, count, required, "waiting for a stable match");
        self.context.state = CycleState::Stabilizing;
        self.schedule_tick(self.config.interval);
        CycleDecision::Stabilizing {
            card_id,
            count,
            required,
        }
    }

    fn navigate(&mut self, card_id: String, matched_by: MatchedBy, confidence: f64) -> CycleDecision {
        self.cancel_timers();
        self.context.tracker.reset();
        self.context.pending_selection = None;
        self.context.state = CycleState::Navigated;
        info!(card_id = %card_id, %matched_by, confidence, "navigating to card");
        self.events.send(CycleEvent::Navigated {
            card_id: card_id.clone(),
            matched_by,
            confidence,
        });
        CycleDecision::Navigate {
            card_id,
            matched_by,
            confidence,
        }
    }

    fn await_selection(&mut self, result: ScanResult) -> CycleDecision {
        self.cancel_timers();
        self.context.tracker.reset();
        self.context.miss_streak += 1;
        self.context.state = CycleState::AmbiguousWait;
        self.context.pending_selection = Some(result.clone());
        info!(candidates = result.candidates().len(), "ambiguous scan, waiting for a pick");
        self.events.send(CycleEvent::AmbiguousPaused { result: result.clone() });
        CycleDecision::AwaitSelection(result)
    }

    fn record_miss(&mut self) {
        self.context.tracker.reset();
        self.context.miss_streak += 1;
        self.context.state = CycleState::Idle;
        self.schedule_tick(self.config.interval);
    }

    fn schedule_tick(&mut self, delay: Duration) {
        if let Some(tick) = self.context.tick.take() {
            self.scheduler.cancel(tick);
        }
        self.context.tick = Some(self.scheduler.schedule(delay, TimerTask::Tick));
    }

    fn cancel_timers(&mut self) {
        self.scheduler.cancel_all();
        self.context.tick = None;
        self.context.watchdog = None;
    }
}
