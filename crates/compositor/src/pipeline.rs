//! The frame loop and the handle that owns its resources.
//!
//! One tokio task ticks at the capture frame rate, pulls frames and spawns
//! an independent segmentation request per frame. Results land in the
//! [`SharedOutput`]. Stream, model and cancellation live in a
//! [`PipelineHandle`] whose `dispose` is idempotent and runs from `Drop`.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::RgbImage;
use incruste_common::clock::{RateController, SessionClock};
use incruste_common::config::PipelineDefaults;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureStream;
use crate::raster::{CommitOutcome, SharedOutput};
use crate::segmentation::SegmentationModel;
use crate::status::StatusCell;

/// Shortest tick the frame loop accepts.
const MIN_FRAME_INTERVAL: Duration = Duration::from_micros(100);

/// Frame-loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Outstanding segmentation requests allowed at once (at least 1).
    pub max_in_flight: usize,

    /// Statistics log rate (Hz).
    pub stats_log_hz: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineDefaults::default().into()
    }
}

impl From<PipelineDefaults> for PipelineOptions {
    fn from(d: PipelineDefaults) -> Self {
        Self {
            max_in_flight: d.max_in_flight.max(1),
            stats_log_hz: d.stats_log_hz,
        }
    }
}

/// Runtime statistics from the live pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Frames pulled from the capture stream.
    pub frames_captured: u64,

    /// Segmentation requests submitted.
    pub requests_issued: u64,

    /// Results that became the presented output.
    pub results_committed: u64,

    /// Results superseded by a newer request.
    pub results_stale: u64,

    /// Results that arrived after teardown began.
    pub results_discarded: u64,

    /// Ticks skipped because too many requests were outstanding.
    pub frames_dropped: u64,

    /// Failed inference calls.
    pub model_errors: u64,
}

impl PipelineStats {
    /// Drop rate as a percentage.
    pub fn drop_rate(&self) -> f64 {
        let total = self.frames_captured + self.frames_dropped;
        if total == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / total as f64 * 100.0
    }
}

#[derive(Default)]
struct StatsCounters {
    frames_captured: AtomicU64,
    requests_issued: AtomicU64,
    results_committed: AtomicU64,
    results_stale: AtomicU64,
    results_discarded: AtomicU64,
    frames_dropped: AtomicU64,
    model_errors: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            results_committed: self.results_committed.load(Ordering::Relaxed),
            results_stale: self.results_stale.load(Ordering::Relaxed),
            results_discarded: self.results_discarded.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            model_errors: self.model_errors.load(Ordering::Relaxed),
        }
    }
}

/// Capture stream and model, released together exactly once.
struct PipelineResources {
    stream: Mutex<Option<Box<dyn CaptureStream>>>,
    model: Arc<dyn SegmentationModel>,
    released: AtomicBool,
}

impl PipelineResources {
    fn next_frame(&self) -> Option<RgbImage> {
        let mut stream = self.stream.lock().ok()?;
        stream.as_mut()?.next_frame()
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut stream) = self.stream.lock() {
            if let Some(mut stream) = stream.take() {
                stream.stop_tracks();
            }
        }
        self.model.close();
        tracing::info!(model = self.model.name(), "Pipeline resources released");
    }
}

/// Everything a frame loop or request task needs.
#[derive(Clone)]
struct LoopContext {
    resources: Arc<PipelineResources>,
    output: Arc<SharedOutput>,
    stats: Arc<StatsCounters>,
    status: Arc<StatusCell>,
    cancel: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

/// Owner of a running frame loop.
pub struct PipelineHandle {
    ctx: LoopContext,
    task: Option<JoinHandle<()>>,
    disposed: bool,
}

impl PipelineHandle {
    /// Start the frame loop on the current tokio runtime.
    pub fn spawn(
        stream: Box<dyn CaptureStream>,
        model: Arc<dyn SegmentationModel>,
        frame_interval: Duration,
        options: PipelineOptions,
        status: Arc<StatusCell>,
    ) -> Self {
        // `interval` panics on a zero period.
        let frame_interval = frame_interval.max(MIN_FRAME_INTERVAL);
        let (width, height) = stream.resolution();
        let ctx = LoopContext {
            resources: Arc::new(PipelineResources {
                stream: Mutex::new(Some(stream)),
                model,
                released: AtomicBool::new(false),
            }),
            output: Arc::new(SharedOutput::new(width, height)),
            stats: Arc::new(StatsCounters::default()),
            status,
            cancel: CancellationToken::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        };

        tracing::info!(
            width,
            height,
            interval_ms = frame_interval.as_millis() as u64,
            max_in_flight = options.max_in_flight,
            "Starting frame loop"
        );
        let task = tokio::spawn(run_frame_loop(ctx.clone(), frame_interval, options));

        Self {
            ctx,
            task: Some(task),
            disposed: false,
        }
    }

    pub fn output(&self) -> &Arc<SharedOutput> {
        &self.ctx.output
    }

    pub fn stats(&self) -> PipelineStats {
        self.ctx.stats.snapshot()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Cancel the loop, refuse further output and release stream and model.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.ctx.cancel.cancel();
        self.ctx.output.dispose();
        self.ctx.resources.release();
        tracing::debug!(stats = ?self.ctx.stats.snapshot(), "Pipeline disposed");
    }

    /// Dispose and wait for the frame loop task to finish.
    pub async fn shutdown(&mut self) {
        self.dispose();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Frame loop task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn run_frame_loop(ctx: LoopContext, frame_interval: Duration, options: PipelineOptions) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let clock = SessionClock::start();
    tracing::debug!(started_at = clock.epoch_wall(), "Frame loop running");
    let mut stats_rate = RateController::new(options.stats_log_hz);
    let max_in_flight = options.max_in_flight.max(1);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if stats_rate.should_tick(clock.elapsed_ns()) {
            let stats = ctx.stats.snapshot();
            tracing::debug!(
                captured = stats.frames_captured,
                committed = stats.results_committed,
                stale = stats.results_stale,
                dropped = stats.frames_dropped,
                drop_rate = stats.drop_rate(),
                "Pipeline stats"
            );
        }

        if ctx.in_flight.load(Ordering::SeqCst) >= max_in_flight {
            StatsCounters::bump(&ctx.stats.frames_dropped);
            continue;
        }

        let Some(frame) = ctx.resources.next_frame() else {
            continue;
        };
        StatsCounters::bump(&ctx.stats.frames_captured);

        let seq = ctx.output.issue_next();
        StatsCounters::bump(&ctx.stats.requests_issued);
        ctx.in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(run_request(ctx.clone(), seq, frame));
    }

    ctx.resources.release();
    tracing::debug!(uptime_ms = clock.elapsed_ns() / 1_000_000, "Frame loop exited");
}

async fn run_request(ctx: LoopContext, seq: u64, frame: RgbImage) {
    let model = ctx.resources.model.clone();
    let outcome = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => None,
        result = model.segment(frame) => Some(result),
    };

    match outcome {
        None => StatsCounters::bump(&ctx.stats.results_discarded),
        Some(Ok(result)) => {
            // Compositing is per-pixel work; keep it off the async workers.
            let committed = tokio::task::spawn_blocking({
                let output = Arc::clone(&ctx.output);
                move || output.commit(seq, &result)
            })
            .await;
            match committed {
                Ok(CommitOutcome::Committed) => {
                    StatsCounters::bump(&ctx.stats.results_committed)
                }
                Ok(CommitOutcome::Stale) => {
                    tracing::trace!(seq, "Stale segmentation result discarded");
                    StatsCounters::bump(&ctx.stats.results_stale);
                }
                Ok(CommitOutcome::Disposed) => StatsCounters::bump(&ctx.stats.results_discarded),
                Err(e) => {
                    tracing::warn!(seq, "Composite worker join failed: {}", e);
                    StatsCounters::bump(&ctx.stats.results_discarded);
                }
            }
        }
        Some(Err(e)) => {
            StatsCounters::bump(&ctx.stats.model_errors);
            if !ctx.cancel.is_cancelled() {
                tracing::error!(seq, "Segmentation failed: {}", e);
                ctx.status.fail(e.user_reason());
                ctx.cancel.cancel();
            }
        }
    }

    // A request stays outstanding until its result is composited.
    ctx.in_flight.fetch_sub(1, Ordering::SeqCst);
}
