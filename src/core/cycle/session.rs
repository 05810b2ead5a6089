//! Runs a controller against real collaborators.
//!
//! Capture and recognition each run on a worker thread; the session waits
//! on a channel with a deadline. A phase that overruns is abandoned, its
//! late result is dropped, and the cycle completes with a [`CycleError`].
//!
//! Abandoned workers cannot be killed, so they keep running until their
//! collaborator returns. At most [`MAX_OUTSTANDING_WORKERS`] may be alive
//! at once; past that, cycles fail with [`CycleError::WorkersExhausted`]
//! instead of spawning more threads behind a hung camera.

use super::context::CycleState;
use super::controller::{CycleDecision, CycleRequest, ScanCycleController};
use super::scheduler::Scheduler;
use crate::core::frame::FrameSource;
use crate::core::orchestrator::{FrameInput, PreparedScan, ScanOrchestrator};
use crate::core::result::ScanResult;
use crate::error::CycleError;
use crossbeam_channel::{bounded, unbounded, RecvTimeoutError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Live capture and resolve threads allowed per session, abandoned ones included
pub const MAX_OUTSTANDING_WORKERS: usize = 4;

enum ResolveMessage {
    /// Fingerprints are extracted; resolution has begun
    Extracted,
    Done(ScanResult),
}

pub struct ScanSession<S: Scheduler> {
    controller: ScanCycleController<S>,
    source: Arc<dyn FrameSource>,
    orchestrator: Arc<ScanOrchestrator>,
    workers: Arc<AtomicUsize>,
}

/// Counts a worker as live until its thread finishes, panics included
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<S: Scheduler> ScanSession<S> {
    pub fn new(
        controller: ScanCycleController<S>,
        source: Arc<dyn FrameSource>,
        orchestrator: Arc<ScanOrchestrator>,
    ) -> Self {
        Self {
            controller,
            source,
            orchestrator,
            workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Worker threads still running, including abandoned ones
    pub fn outstanding_workers(&self) -> usize {
        self.workers.load(Ordering::Acquire)
    }

    pub fn controller(&self) -> &ScanCycleController<S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ScanCycleController<S> {
        &mut self.controller
    }

    pub fn start(&mut self) {
        self.controller.start();
    }

    /// Run the next due cycle to completion. `None` when no cycle is due.
    pub fn run_scan_cycle(&mut self) -> Option<CycleDecision> {
        let request = self.controller.poll()?;
        let outcome = self.execute(request);
        Some(self.controller.complete_cycle(request.cycle, outcome))
    }

    /// Cycle until the loop navigates or waits on ambiguity, or `budget`
    /// of scheduler time passes.
    pub fn run_until_settled(&mut self, budget: Duration) -> Option<CycleDecision> {
        let deadline = self.controller.scheduler().now() + budget;
        loop {
            if let Some(decision) = self.run_scan_cycle() {
                if matches!(
                    decision,
                    CycleDecision::Navigate { .. } | CycleDecision::AwaitSelection(_)
                ) {
                    return Some(decision);
                }
                continue;
            }
            let now = self.controller.scheduler().now();
            if now >= deadline {
                return None;
            }
            if !self.controller.scheduler_mut().wait_for_next(deadline - now) {
                return None;
            }
        }
    }

    fn execute(&mut self, request: CycleRequest) -> Result<ScanResult, CycleError> {
        let frame = self.capture()?;
        self.controller.enter_phase(request.cycle, CycleState::Extracting);
        self.resolve(request, frame)
    }

    fn capture(&self) -> Result<FrameInput, CycleError> {
        let timeout = self.controller.config().capture_timeout;
        let (tx, rx) = bounded(1);
        let source = Arc::clone(&self.source);
        self.spawn_worker("scan-capture", move || {
            let _ = tx.send(source.capture());
        })?;

        match rx.recv_timeout(timeout) {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(reason)) => Err(CycleError::CaptureFailed(reason)),
            Err(RecvTimeoutError::Timeout) => Err(CycleError::CaptureTimeout { timeout }),
            Err(RecvTimeoutError::Disconnected) => Err(CycleError::WorkerDisconnected),
        }
    }

    fn resolve(&mut self, request: CycleRequest, frame: FrameInput) -> Result<ScanResult, CycleError> {
        let timeout = self.controller.config().resolve_timeout;
        let deadline = Instant::now() + timeout;
        let (tx, rx) = unbounded();
        let orchestrator = Arc::clone(&self.orchestrator);
        let policy = request.policy;
        self.spawn_worker("scan-resolve", move || {
            let result = match orchestrator.prepare_scan(&frame, &policy) {
                PreparedScan::Decided(result) => result,
                PreparedScan::Extracted(extracted) => {
                    let _ = tx.send(ResolveMessage::Extracted);
                    orchestrator.finish_scan(&extracted, &policy)
                }
            };
            let _ = tx.send(ResolveMessage::Done(result));
        })?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(ResolveMessage::Extracted) => {
                    self.controller.enter_phase(request.cycle, CycleState::Resolving);
                }
                Ok(ResolveMessage::Done(result)) => return Ok(result),
                Err(RecvTimeoutError::Timeout) => {
                    debug!(cycle = request.cycle, "abandoning slow recognition");
                    return Err(CycleError::ResolveTimeout { timeout });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(CycleError::WorkerDisconnected),
            }
        }
    }
}

impl<S: Scheduler> ScanSession<S> {
    fn spawn_worker(&self, name: &str, work: impl FnOnce() + Send + 'static) -> Result<(), CycleError> {
        let outstanding = self.workers.fetch_add(1, Ordering::AcqRel);
        let slot = WorkerSlot(Arc::clone(&self.workers));
        if outstanding >= MAX_OUTSTANDING_WORKERS {
            warn!(worker = name, outstanding, "too many scan workers still running");
            return Err(CycleError::WorkersExhausted { outstanding });
        }

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _slot = slot;
                work();
            })
            .map(|_| ())
            .map_err(|e| {
                warn!(worker = name, error = %e, "failed to spawn scan worker");
                CycleError::WorkerDisconnected
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{CardRow, CatalogFingerprintRow, CatalogStore, InMemoryCatalog};
    use crate::core::cycle::{CycleConfig, ManualScheduler};
    use crate::core::extractor::FingerprintExtractor;
    use crate::core::geometry::{FrameRect, RegionKind};
    use crate::core::hasher::GrayscaleImage;
    use crate::core::result::MatchedBy;
    use crate::events::{null_sender, CycleEvent, Event, EventChannel};

    struct SlowSource(Duration);

    impl FrameSource for SlowSource {
        fn capture(&self) -> Result<FrameInput, String> {
            thread::sleep(self.0);
            Ok(FrameInput::default())
        }
    }

    struct FailingSource;

    impl FrameSource for FailingSource {
        fn capture(&self) -> Result<FrameInput, String> {
            Err("camera unplugged".into())
        }
    }

    struct PanickingSource;

    impl FrameSource for PanickingSource {
        fn capture(&self) -> Result<FrameInput, String> {
            panic!("driver crashed")
        }
    }

    fn textured() -> GrayscaleImage {
        GrayscaleImage::from_fn(160, 224, |x, y| (((x / 7) * 31 + (y / 5) * 113) % 256) as u8)
    }

    fn session(source: Arc<dyn FrameSource>, config: CycleConfig) -> ScanSession<ManualScheduler> {
        let orchestrator = Arc::new(ScanOrchestrator::fingerprint_only(Arc::new(InMemoryCatalog::new())));
        let controller = ScanCycleController::new(config, ManualScheduler::new(), null_sender());
        let mut session = ScanSession::new(controller, source, orchestrator);
        session.start();
        session
    }

    #[test]
    fn slow_capture_times_out() {
        let config = CycleConfig::fingerprint().timeouts(Duration::from_millis(20), Duration::from_millis(500));
        let mut session = session(Arc::new(SlowSource(Duration::from_millis(300))), config);
        let decision = session.run_scan_cycle().unwrap();
        assert!(matches!(
            decision,
            CycleDecision::Failed(CycleError::CaptureTimeout { .. })
        ));
        assert_eq!(session.controller().state(), CycleState::Idle);
    }

    /// Blocks every capture until the gate's sender is dropped
    struct GatedSource(crossbeam_channel::Receiver<()>);

    impl FrameSource for GatedSource {
        fn capture(&self) -> Result<FrameInput, String> {
            let _ = self.0.recv();
            Ok(FrameInput::default())
        }
    }

    #[test]
    fn hung_captures_are_capped() {
        let (gate, blocked) = crossbeam_channel::unbounded::<()>();
        let config = CycleConfig::fingerprint().timeouts(Duration::from_millis(10), Duration::from_millis(500));
        let interval = config.interval;
        let mut session = session(Arc::new(GatedSource(blocked)), config);

        for _ in 0..MAX_OUTSTANDING_WORKERS {
            let decision = session.run_scan_cycle().unwrap();
            assert!(matches!(
                decision,
                CycleDecision::Failed(CycleError::CaptureTimeout { .. })
            ));
            session.controller_mut().scheduler_mut().advance(interval);
        }
        assert_eq!(session.outstanding_workers(), MAX_OUTSTANDING_WORKERS);

        assert_eq!(
            session.run_scan_cycle(),
            Some(CycleDecision::Failed(CycleError::WorkersExhausted {
                outstanding: MAX_OUTSTANDING_WORKERS
            }))
        );
        assert_eq!(session.outstanding_workers(), MAX_OUTSTANDING_WORKERS);

        drop(gate);
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.outstanding_workers() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(session.outstanding_workers(), 0);
    }

    #[test]
    fn capture_errors_and_panics_are_contained() {
        let mut failing = session(Arc::new(FailingSource), CycleConfig::fingerprint());
        assert_eq!(
            failing.run_scan_cycle(),
            Some(CycleDecision::Failed(CycleError::CaptureFailed("camera unplugged".into())))
        );

        let mut panicking = session(Arc::new(PanickingSource), CycleConfig::fingerprint());
        assert_eq!(
            panicking.run_scan_cycle(),
            Some(CycleDecision::Failed(CycleError::WorkerDisconnected))
        );
    }

    #[test]
    fn missing_image_is_a_miss() {
        let mut session = session(
            Arc::new(SlowSource(Duration::ZERO)),
            CycleConfig::fingerprint(),
        );
        assert_eq!(session.run_scan_cycle(), Some(CycleDecision::Miss));
        assert!(session.run_scan_cycle().is_none());
    }

    #[test]
    fn indexed_frame_navigates_once() {
        let image = textured();
        let card = CardRow {
            card_id: "ref".into(),
            name: "Reference".into(),
            aliases: Vec::new(),
            set_code: "tst".into(),
            collector_number: "1".into(),
            lang: "en".into(),
        };
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.upsert_card(&card).unwrap();
        let rows: Vec<_> = FingerprintExtractor::default()
            .extract_region(&image, &FrameRect::FULL, RegionKind::FullCard)
            .iter()
            .map(|fp| CatalogFingerprintRow::from_fingerprint(&card, "full", fp))
            .collect();
        catalog.insert_fingerprints(&rows).unwrap();

        let (sender, receiver) = EventChannel::new();
        let controller = ScanCycleController::new(CycleConfig::fingerprint(), ManualScheduler::new(), sender);
        let source = Arc::new(crate::core::frame::StillFrameSource::new(FrameInput::new(image)));
        let orchestrator = Arc::new(ScanOrchestrator::fingerprint_only(catalog));
        let mut session = ScanSession::new(controller, source, orchestrator);
        session.start();

        let decision = session.run_until_settled(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            decision,
            CycleDecision::Navigate { matched_by: MatchedBy::FingerprintExact, .. }
        ));
        assert!(session.run_until_settled(Duration::from_secs(5)).is_none());

        let navigations = receiver
            .drain()
            .into_iter()
            .filter(|e| matches!(e, Event::Cycle(CycleEvent::Navigated { .. })))
            .count();
        assert_eq!(navigations, 1);
    }
}
