//! Scan Session Controller
//!
//! Orchestrates repeated capture → recognize → resolve cycles on a dedicated
//! worker thread, owns the session status state machine, and guarantees the
//! camera and recognizer are released exactly once on every exit path. The UI
//! talks to the worker only through channels, so at most one analysis cycle is
//! ever in flight and results that complete after cancellation are discarded
//! instead of applied.

pub mod resolve;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::{CameraSource, CaptureError, FrameSource, PreviewFrame};
use crate::catalog::{CatalogClient, CatalogError, PokemonDetail, PokemonSummary};
use crate::config::AppConfig;
use crate::recognize::{
    LocalOcr, ModelManager, RecognizeError, Recognizer, RecognizerBackend, RemoteVision,
};

/// Preview frames are downscaled to at most this width before upload
const PREVIEW_MAX_WIDTH: u32 = 640;

/// Idle tick between preview refreshes
const FRAME_TICK: Duration = Duration::from_millis(33);

/// Slice used by interruptible sleeps so cancel stays responsive
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Consecutive snapshot failures tolerated before the device counts as lost
const MAX_CAPTURE_FAILURES: u32 = 3;

/// Session status, rendered on the scanner HUD
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    Initializing,
    AwaitingPermission,
    Scanning,
    Analyzing,
    Matched(String),
    Failed(ScanFailure),
    Closed,
}

impl ScanStatus {
    /// Whether the session has reached a state it cannot leave without user
    /// action
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Failed(_) | ScanStatus::Closed)
    }
}

/// Terminal failure reasons, each user-dismissible
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFailure {
    /// Camera access refused by the user or OS
    Permission,
    /// No camera, or the stream died
    Device(String),
    /// The recognizer could not be constructed
    RecognizerSetup(String),
}

impl std::fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanFailure::Permission => {
                write!(f, "Camera access denied. Check system permissions.")
            }
            ScanFailure::Device(detail) => write!(f, "Camera unavailable: {}", detail),
            ScanFailure::RecognizerSetup(detail) => {
                write!(f, "Failed to initialize the recognition engine: {}", detail)
            }
        }
    }
}

/// Commands from the dashboard to the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommand {
    /// Run one analysis cycle (remote backend; ignored while one is in flight)
    Capture,
    /// Tear the session down
    Cancel,
}

/// Events from the worker to the dashboard
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Status transition
    Status(ScanStatus),
    /// A candidate resolved to a catalog entry; the session is handing off
    Identified(PokemonSummary),
    /// A candidate was recognized but matches no catalog entry
    UnknownSubject(String),
    /// A cycle completed without producing a candidate (remote backend)
    NothingRecognized,
    /// A cycle failed and will be retried / awaits the next capture
    CycleError(String),
}

/// Timing and geometry for one session, distilled from the app config
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub backend: RecognizerBackend,
    pub region_fraction: f32,
    pub snapshot_size: u32,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub match_hold: Duration,
}

impl SessionConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            backend: config.scanner.backend,
            region_fraction: config.camera.region_fraction,
            snapshot_size: config.camera.snapshot_size,
            poll_interval: Duration::from_millis(config.scanner.poll_interval_ms),
            error_backoff: Duration::from_millis(config.scanner.error_backoff_ms),
            match_hold: Duration::from_millis(config.scanner.match_hold_ms),
        }
    }
}

/// Handle to a running scan session
pub struct ScanController {
    session_id: Uuid,
    commands: Sender<ScanCommand>,
    events: Receiver<ScanEvent>,
    cancel: Arc<AtomicBool>,
    preview: Arc<Mutex<Option<PreviewFrame>>>,
    worker: Option<JoinHandle<()>>,
}

impl ScanController {
    /// Start a new scan session worker.
    ///
    /// `summaries` is the frozen known-name snapshot for this session; the
    /// client performs the exact-match lookup during resolution.
    pub fn start(
        config: &AppConfig,
        summaries: Vec<PokemonSummary>,
        client: Arc<CatalogClient>,
    ) -> Self {
        let session_id = Uuid::new_v4();
        let session_config = SessionConfig::from_app(config);
        let backend = session_config.backend;

        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let preview = Arc::new(Mutex::new(None));

        let ctx = SessionContext {
            session_id,
            config: session_config,
            events: event_tx,
            commands: command_rx,
            cancel: cancel.clone(),
            preview: preview.clone(),
        };

        let vision_settings = config.vision.clone();
        let camera_settings = config.camera.clone();
        let known_names: Vec<String> = summaries.iter().map(|s| s.name.clone()).collect();

        let worker = std::thread::Builder::new()
            .name("scan-session".to_string())
            .spawn(move || {
                let make_recognizer = move || -> Result<Box<dyn Recognizer>, RecognizeError> {
                    match backend {
                        RecognizerBackend::LocalOcr => {
                            let manager = ModelManager::new()
                                .map_err(|e| RecognizeError::Setup(e.to_string()))?;
                            Ok(Box::new(LocalOcr::new(&manager, known_names)?))
                        }
                        RecognizerBackend::RemoteVision => {
                            Ok(Box::new(RemoteVision::new(&vision_settings)?))
                        }
                    }
                };
                let acquire = move || CameraSource::acquire(&camera_settings);
                let lookup = move |key: &str| client.get_detail(key);

                run_session(ctx, make_recognizer, acquire, lookup, summaries);
            })
            .expect("failed to spawn scan worker");

        info!("Scan session {} started ({:?})", session_id, backend);

        Self {
            session_id,
            commands: command_tx,
            events: event_rx,
            cancel,
            preview,
            worker: Some(worker),
        }
    }

    /// Drain one pending worker event, if any
    pub fn poll_event(&self) -> Option<ScanEvent> {
        self.events.try_recv().ok()
    }

    /// Request one analysis cycle (remote backend)
    pub fn trigger_capture(&self) {
        let _ = self.commands.send(ScanCommand::Capture);
    }

    /// Cancel the session. Takes effect immediately; an in-flight cycle's
    /// result will be discarded.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        let _ = self.commands.send(ScanCommand::Cancel);
    }

    /// Take the latest preview frame, if a new one is available
    pub fn take_preview(&self) -> Option<PreviewFrame> {
        self.preview.lock().take()
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map(|h| h.is_finished()).unwrap_or(true)
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        debug!("Scan session {} controller dropped", self.session_id);
    }
}

/// Worker-side session state shared with the spawning controller
struct SessionContext {
    session_id: Uuid,
    config: SessionConfig,
    events: Sender<ScanEvent>,
    commands: Receiver<ScanCommand>,
    cancel: Arc<AtomicBool>,
    preview: Arc<Mutex<Option<PreviewFrame>>>,
}

impl SessionContext {
    fn set_status(&self, status: ScanStatus) {
        debug!("Session {} -> {:?}", self.session_id, status);
        let _ = self.events.send(ScanEvent::Status(status));
    }

    fn send(&self, event: ScanEvent) {
        let _ = self.events.send(event);
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Fold pending commands into the cancel flag; returns whether a capture
    /// was requested. Commands that arrive while a cycle is in flight are
    /// drained afterwards and deliberately dropped.
    fn drain_commands(&self) -> bool {
        let mut capture_requested = false;
        while let Ok(command) = self.commands.try_recv() {
            match command {
                ScanCommand::Capture => capture_requested = true,
                ScanCommand::Cancel => self.cancel.store(true, Ordering::SeqCst),
            }
        }
        capture_requested
    }

    /// Drop commands accumulated during an in-flight cycle, honoring Cancel
    fn discard_stale_commands(&self) {
        while let Ok(command) = self.commands.try_recv() {
            if command == ScanCommand::Cancel {
                self.cancel.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Sleep in small slices so cancellation stays responsive.
    /// Returns true if the session was cancelled during the sleep.
    fn interruptible_sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            if self.cancelled() {
                return true;
            }
            self.discard_stale_commands();
            if self.cancelled() {
                return true;
            }
            std::thread::sleep(CANCEL_POLL.min(duration));
        }
        self.cancelled()
    }

    /// Park in a terminal failure state until the user dismisses the session
    fn fail_and_wait(&self, failure: ScanFailure) {
        self.set_status(ScanStatus::Failed(failure));
        while !self.cancelled() {
            self.discard_stale_commands();
            std::thread::sleep(CANCEL_POLL);
        }
    }
}

/// Outcome of one capture → recognize → resolve cycle
enum CycleOutcome {
    Matched(PokemonSummary),
    NoCandidate,
    Unresolved(String),
    CaptureFailed(CaptureError),
    RecognizeFailed(RecognizeError),
}

/// Run one full scan session to completion.
///
/// Generic over the frame source, recognizer, and catalog lookup so the state
/// machine can be driven by stubs in tests. Resources are constructed inside
/// the session and released on every exit path.
fn run_session<S, R, A, M, L>(
    ctx: SessionContext,
    make_recognizer: M,
    acquire_source: A,
    lookup: L,
    summaries: Vec<PokemonSummary>,
) where
    S: FrameSource,
    R: Recognizer,
    A: FnOnce() -> Result<S, CaptureError>,
    M: FnOnce() -> Result<R, RecognizeError>,
    L: Fn(&str) -> Result<PokemonDetail, CatalogError>,
{
    ctx.set_status(ScanStatus::Initializing);

    let mut recognizer = match make_recognizer() {
        Ok(recognizer) => recognizer,
        Err(e) => {
            error!("Recognizer setup failed: {}", e);
            ctx.fail_and_wait(ScanFailure::RecognizerSetup(e.to_string()));
            ctx.set_status(ScanStatus::Closed);
            return;
        }
    };

    if ctx.cancelled() {
        drop(recognizer);
        ctx.set_status(ScanStatus::Closed);
        return;
    }

    ctx.set_status(ScanStatus::AwaitingPermission);
    let mut source = match acquire_source() {
        Ok(source) => source,
        Err(CaptureError::PermissionDenied) => {
            warn!("Camera permission denied");
            drop(recognizer);
            ctx.fail_and_wait(ScanFailure::Permission);
            ctx.set_status(ScanStatus::Closed);
            return;
        }
        Err(CaptureError::DeviceUnavailable(detail)) => {
            warn!("Camera unavailable: {}", detail);
            drop(recognizer);
            ctx.fail_and_wait(ScanFailure::Device(detail));
            ctx.set_status(ScanStatus::Closed);
            return;
        }
    };

    ctx.set_status(ScanStatus::Scanning);

    let polling = ctx.config.backend.is_polling();
    // The local backend analyzes as soon as the stream is up
    let mut next_analysis = Instant::now();
    let mut capture_failures = 0u32;
    let mut device_lost: Option<String> = None;

    loop {
        if ctx.cancelled() {
            break;
        }

        let capture_requested = ctx.drain_commands();
        if ctx.cancelled() {
            break;
        }

        if let Some(frame) = source.preview_frame(PREVIEW_MAX_WIDTH) {
            *ctx.preview.lock() = Some(frame);
        }

        let should_analyze = if polling {
            Instant::now() >= next_analysis
        } else {
            capture_requested
        };

        if !should_analyze {
            std::thread::sleep(FRAME_TICK);
            continue;
        }

        ctx.set_status(ScanStatus::Analyzing);
        let outcome = run_cycle(&mut source, &mut recognizer, &ctx.config, &summaries, &lookup);

        // Capture presses and results that raced the cycle are void now
        ctx.discard_stale_commands();
        if ctx.cancelled() {
            debug!("Session {} cancelled mid-cycle; result discarded", ctx.session_id);
            break;
        }

        match outcome {
            CycleOutcome::Matched(summary) => {
                info!("Visual match: {}", summary.name);
                ctx.set_status(ScanStatus::Matched(summary.name.clone()));
                // Short HUD hold before hand-off, still cancellable
                if ctx.interruptible_sleep(ctx.config.match_hold) {
                    break;
                }
                ctx.send(ScanEvent::Identified(summary));
                break;
            }
            CycleOutcome::NoCandidate => {
                capture_failures = 0;
                ctx.set_status(ScanStatus::Scanning);
                if polling {
                    next_analysis = Instant::now() + ctx.config.poll_interval;
                } else {
                    ctx.send(ScanEvent::NothingRecognized);
                }
            }
            CycleOutcome::Unresolved(candidate) => {
                capture_failures = 0;
                info!("Recognized '{}' but it matches no catalog entry", candidate);
                ctx.send(ScanEvent::UnknownSubject(candidate));
                ctx.set_status(ScanStatus::Scanning);
                if polling {
                    next_analysis = Instant::now() + ctx.config.poll_interval;
                }
            }
            CycleOutcome::CaptureFailed(e) => {
                capture_failures += 1;
                warn!("Snapshot failed ({}/{}): {}", capture_failures, MAX_CAPTURE_FAILURES, e);
                if capture_failures >= MAX_CAPTURE_FAILURES {
                    device_lost = Some(e.to_string());
                    break;
                }
                ctx.set_status(ScanStatus::Scanning);
                if polling {
                    next_analysis = Instant::now() + ctx.config.error_backoff;
                }
            }
            CycleOutcome::RecognizeFailed(e) => {
                capture_failures = 0;
                warn!("Recognition cycle failed: {}", e);
                ctx.send(ScanEvent::CycleError(e.to_string()));
                ctx.set_status(ScanStatus::Scanning);
                if polling {
                    // Back off harder than the normal poll cadence
                    next_analysis = Instant::now() + ctx.config.error_backoff;
                }
            }
        }
    }

    // Single teardown point: both handles are released exactly once no matter
    // which branch broke the loop.
    source.release();
    drop(recognizer);

    if let Some(detail) = device_lost {
        ctx.fail_and_wait(ScanFailure::Device(detail));
    }

    ctx.set_status(ScanStatus::Closed);
    info!("Scan session {} closed", ctx.session_id);
}

/// One snapshot → recognize → resolve pass
fn run_cycle<S, R, L>(
    source: &mut S,
    recognizer: &mut R,
    config: &SessionConfig,
    summaries: &[PokemonSummary],
    lookup: &L,
) -> CycleOutcome
where
    S: FrameSource,
    R: Recognizer,
    L: Fn(&str) -> Result<PokemonDetail, CatalogError>,
{
    let snapshot = match source.snapshot(config.region_fraction, config.snapshot_size) {
        Ok(snapshot) => snapshot,
        Err(e) => return CycleOutcome::CaptureFailed(e),
    };

    match recognizer.recognize(&snapshot) {
        Ok(Some(candidate)) => match resolve::resolve_with(&candidate, summaries, lookup) {
            Some(summary) => CycleOutcome::Matched(summary),
            None => CycleOutcome::Unresolved(candidate),
        },
        Ok(None) => CycleOutcome::NoCandidate,
        Err(e) => CycleOutcome::RecognizeFailed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Snapshot;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;

    fn summaries() -> Vec<PokemonSummary> {
        ["pikachu", "raichu", "bulbasaur"]
            .iter()
            .enumerate()
            .map(|(i, name)| PokemonSummary {
                id: i as u32 + 1,
                name: name.to_string(),
                types: vec![],
                artwork_url: None,
            })
            .collect()
    }

    fn failing_lookup(_key: &str) -> Result<PokemonDetail, CatalogError> {
        Err(CatalogError::NotFound("stub".to_string()))
    }

    fn test_config(backend: RecognizerBackend) -> SessionConfig {
        SessionConfig {
            backend,
            region_fraction: 0.8,
            snapshot_size: 16,
            poll_interval: Duration::from_millis(1),
            error_backoff: Duration::from_millis(2),
            match_hold: Duration::from_millis(1),
        }
    }

    struct StubSource {
        releases: Arc<AtomicU32>,
        fail_snapshots: bool,
    }

    impl StubSource {
        fn new(releases: Arc<AtomicU32>) -> Self {
            Self { releases, fail_snapshots: false }
        }
    }

    impl FrameSource for StubSource {
        fn snapshot(&mut self, _f: f32, size: u32) -> Result<Snapshot, CaptureError> {
            if self.fail_snapshots {
                return Err(CaptureError::DeviceUnavailable("stub gone".to_string()));
            }
            Ok(Snapshot::new(vec![0; (size * size * 3) as usize], size, size))
        }

        fn preview_frame(&mut self, _max_width: u32) -> Option<PreviewFrame> {
            None
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedRecognizer {
        backend: RecognizerBackend,
        script: VecDeque<Result<Option<String>, RecognizeError>>,
        calls: Arc<AtomicU32>,
        cancel_on_call: Option<Arc<AtomicBool>>,
    }

    impl ScriptedRecognizer {
        fn new(
            backend: RecognizerBackend,
            script: Vec<Result<Option<String>, RecognizeError>>,
        ) -> Self {
            Self {
                backend,
                script: script.into(),
                calls: Arc::new(AtomicU32::new(0)),
                cancel_on_call: None,
            }
        }
    }

    impl Recognizer for ScriptedRecognizer {
        fn recognize(&mut self, _s: &Snapshot) -> Result<Option<String>, RecognizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(cancel) = &self.cancel_on_call {
                // Simulates the user cancelling while this cycle is in flight
                cancel.store(true, Ordering::SeqCst);
            }
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn backend(&self) -> RecognizerBackend {
            self.backend
        }
    }

    struct Harness {
        events: Receiver<ScanEvent>,
        commands: Sender<ScanCommand>,
        cancel: Arc<AtomicBool>,
    }

    fn make_ctx(config: SessionConfig) -> (SessionContext, Harness) {
        let (event_tx, event_rx) = unbounded();
        let (command_tx, command_rx) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));

        let ctx = SessionContext {
            session_id: Uuid::new_v4(),
            config,
            events: event_tx,
            commands: command_rx,
            cancel: cancel.clone(),
            preview: Arc::new(Mutex::new(None)),
        };
        let harness = Harness { events: event_rx, commands: command_tx, cancel };
        (ctx, harness)
    }

    fn statuses(events: &[ScanEvent]) -> Vec<ScanStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Status(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ScanStatus::Closed.is_terminal());
        assert!(ScanStatus::Failed(ScanFailure::Permission).is_terminal());
        assert!(!ScanStatus::Scanning.is_terminal());
        assert!(!ScanStatus::Analyzing.is_terminal());
    }

    #[test]
    fn test_match_path_reaches_closed_with_single_release() {
        let (ctx, harness) = make_ctx(test_config(RecognizerBackend::LocalOcr));
        let releases = Arc::new(AtomicU32::new(0));
        let source_releases = releases.clone();

        let recognizer = ScriptedRecognizer::new(
            RecognizerBackend::LocalOcr,
            vec![Ok(None), Ok(Some("pikachu".to_string()))],
        );

        run_session(
            ctx,
            move || Ok(recognizer),
            move || Ok(StubSource::new(source_releases)),
            failing_lookup,
            summaries(),
        );

        let events: Vec<ScanEvent> = harness.events.try_iter().collect();
        let seen = statuses(&events);

        assert_eq!(seen.first(), Some(&ScanStatus::Initializing));
        assert!(seen.contains(&ScanStatus::AwaitingPermission));
        assert!(seen.contains(&ScanStatus::Analyzing));
        assert!(seen.contains(&ScanStatus::Matched("pikachu".to_string())));
        assert_eq!(seen.last(), Some(&ScanStatus::Closed));

        let identified = events.iter().any(|e| {
            matches!(e, ScanEvent::Identified(summary) if summary.name == "pikachu")
        });
        assert!(identified);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_mid_cycle_discards_result() {
        let (ctx, harness) = make_ctx(test_config(RecognizerBackend::LocalOcr));
        let releases = Arc::new(AtomicU32::new(0));
        let source_releases = releases.clone();

        let mut recognizer = ScriptedRecognizer::new(
            RecognizerBackend::LocalOcr,
            vec![Ok(Some("pikachu".to_string()))],
        );
        // The cycle "completes" after cancellation was requested
        recognizer.cancel_on_call = Some(harness.cancel.clone());

        run_session(
            ctx,
            move || Ok(recognizer),
            move || Ok(StubSource::new(source_releases)),
            failing_lookup,
            summaries(),
        );

        let events: Vec<ScanEvent> = harness.events.try_iter().collect();
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Identified(_))));
        let seen = statuses(&events);
        assert!(!seen.iter().any(|s| matches!(s, ScanStatus::Matched(_))));
        assert_eq!(seen.last(), Some(&ScanStatus::Closed));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cycle_error_retries_then_matches() {
        let (ctx, harness) = make_ctx(test_config(RecognizerBackend::LocalOcr));
        let releases = Arc::new(AtomicU32::new(0));
        let source_releases = releases.clone();

        let recognizer = ScriptedRecognizer::new(
            RecognizerBackend::LocalOcr,
            vec![
                Err(RecognizeError::Inference("transient".to_string())),
                Ok(Some("raichu".to_string())),
            ],
        );

        run_session(
            ctx,
            move || Ok(recognizer),
            move || Ok(StubSource::new(source_releases)),
            failing_lookup,
            summaries(),
        );

        let events: Vec<ScanEvent> = harness.events.try_iter().collect();
        assert!(events.iter().any(|e| matches!(e, ScanEvent::CycleError(_))));
        assert!(events.iter().any(|e| {
            matches!(e, ScanEvent::Identified(summary) if summary.name == "raichu")
        }));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_extra_capture_triggers_are_ignored_while_analyzing() {
        let (ctx, harness) = make_ctx(test_config(RecognizerBackend::RemoteVision));
        let releases = Arc::new(AtomicU32::new(0));
        let source_releases = releases.clone();

        let recognizer =
            ScriptedRecognizer::new(RecognizerBackend::RemoteVision, vec![Ok(None)]);
        let calls = recognizer.calls.clone();

        // Three rapid presses queued before the worker runs; only the first
        // may start a cycle, the rest must be dropped, not queued.
        harness.commands.send(ScanCommand::Capture).unwrap();
        harness.commands.send(ScanCommand::Capture).unwrap();
        harness.commands.send(ScanCommand::Capture).unwrap();

        let worker = std::thread::spawn(move || {
            run_session(
                ctx,
                move || Ok(recognizer),
                move || Ok(StubSource::new(source_releases)),
                failing_lookup,
                summaries(),
            );
        });

        // Wait for the single cycle to report back, then dismiss the session
        let mut saw_nothing = false;
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            match harness.events.recv_timeout(Duration::from_millis(100)) {
                Ok(ScanEvent::NothingRecognized) => {
                    saw_nothing = true;
                    break;
                }
                Ok(_) => {}
                Err(_) => {}
            }
        }
        harness.cancel.store(true, Ordering::SeqCst);
        worker.join().unwrap();

        assert!(saw_nothing);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recognizer_setup_failure_is_terminal() {
        let (ctx, harness) = make_ctx(test_config(RecognizerBackend::LocalOcr));
        let releases = Arc::new(AtomicU32::new(0));
        let source_releases = releases.clone();

        let worker = std::thread::spawn(move || {
            run_session(
                ctx,
                move || -> Result<ScriptedRecognizer, RecognizeError> {
                    Err(RecognizeError::Setup("no models".to_string()))
                },
                move || Ok(StubSource::new(source_releases)),
                failing_lookup,
                summaries(),
            );
        });

        // Failure state arrives, then the session parks until dismissed
        let mut saw_failure = false;
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(ScanEvent::Status(ScanStatus::Failed(ScanFailure::RecognizerSetup(_)))) =
                harness.events.recv_timeout(Duration::from_millis(100))
            {
                saw_failure = true;
                break;
            }
        }
        harness.cancel.store(true, Ordering::SeqCst);
        worker.join().unwrap();

        assert!(saw_failure);
        // The camera was never acquired, so nothing to release
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_permission_denied_never_touches_device() {
        let (ctx, harness) = make_ctx(test_config(RecognizerBackend::LocalOcr));

        let recognizer = ScriptedRecognizer::new(RecognizerBackend::LocalOcr, vec![]);

        let worker = std::thread::spawn(move || {
            run_session(
                ctx,
                move || Ok(recognizer),
                || -> Result<StubSource, CaptureError> { Err(CaptureError::PermissionDenied) },
                failing_lookup,
                summaries(),
            );
        });

        let mut saw_permission_failure = false;
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(ScanEvent::Status(ScanStatus::Failed(ScanFailure::Permission))) =
                harness.events.recv_timeout(Duration::from_millis(100))
            {
                saw_permission_failure = true;
                break;
            }
        }
        harness.cancel.store(true, Ordering::SeqCst);
        worker.join().unwrap();

        assert!(saw_permission_failure);
    }

    #[test]
    fn test_unresolved_candidate_keeps_session_alive() {
        let (ctx, harness) = make_ctx(test_config(RecognizerBackend::LocalOcr));
        let releases = Arc::new(AtomicU32::new(0));
        let source_releases = releases.clone();

        let recognizer = ScriptedRecognizer::new(
            RecognizerBackend::LocalOcr,
            vec![
                Ok(Some("missingno".to_string())),
                Ok(Some("bulbasaur".to_string())),
            ],
        );

        run_session(
            ctx,
            move || Ok(recognizer),
            move || Ok(StubSource::new(source_releases)),
            failing_lookup,
            summaries(),
        );

        let events: Vec<ScanEvent> = harness.events.try_iter().collect();
        assert!(events.iter().any(|e| {
            matches!(e, ScanEvent::UnknownSubject(name) if name == "missingno")
        }));
        assert!(events.iter().any(|e| {
            matches!(e, ScanEvent::Identified(summary) if summary.name == "bulbasaur")
        }));
    }

    #[test]
    fn test_persistent_capture_failure_escalates_to_device_failure() {
        let (ctx, harness) = make_ctx(test_config(RecognizerBackend::LocalOcr));
        let releases = Arc::new(AtomicU32::new(0));
        let source_releases = releases.clone();

        let recognizer = ScriptedRecognizer::new(RecognizerBackend::LocalOcr, vec![]);

        let worker = std::thread::spawn(move || {
            run_session(
                ctx,
                move || Ok(recognizer),
                move || {
                    let mut source = StubSource::new(source_releases);
                    source.fail_snapshots = true;
                    Ok(source)
                },
                failing_lookup,
                summaries(),
            );
        });

        let mut saw_device_failure = false;
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(ScanEvent::Status(ScanStatus::Failed(ScanFailure::Device(_)))) =
                harness.events.recv_timeout(Duration::from_millis(100))
            {
                saw_device_failure = true;
                break;
            }
        }
        harness.cancel.store(true, Ordering::SeqCst);
        worker.join().unwrap();

        assert!(saw_device_failure);
        // Device handle released exactly once despite repeated frame failures
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
