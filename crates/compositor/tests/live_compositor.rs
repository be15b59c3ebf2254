//! End-to-end behaviour of the live compositor with scripted collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{GrayImage, RgbImage};
use incruste_common::error::{IncrusteError, IncrusteResult};
use incruste_compositor::capture::{CaptureProvider, CaptureStream, SyntheticCamera};
use incruste_compositor::composite::coverage;
use incruste_compositor::pipeline::PipelineOptions;
use incruste_compositor::segmentation::{
    BackgroundDifferenceFactory, ModelFactory, SegmentationModel, SegmentationOptions,
};
use incruste_compositor::{
    CaptureConstraints, CompositorOptions, CompositorStatus, LiveCompositor, OverlayLabel,
    SegmentationResult,
};
use incruste_timeline::{Performer, SegmentTimeline};
use tokio::sync::Notify;

// Fixtures

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    stops: AtomicUsize,
    closes: AtomicUsize,
    segment_calls: AtomicUsize,
}

struct CountingCamera {
    counters: Arc<Counters>,
    deny: bool,
}

struct CountingStream {
    counters: Arc<Counters>,
    width: u32,
    height: u32,
    live: bool,
}

#[async_trait::async_trait]
impl CaptureProvider for CountingCamera {
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> IncrusteResult<Box<dyn CaptureStream>> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(IncrusteError::capture_unavailable("permission denied"));
        }
        Ok(Box::new(CountingStream {
            counters: self.counters.clone(),
            width: constraints.width,
            height: constraints.height,
            live: true,
        }))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

impl CaptureStream for CountingStream {
    fn next_frame(&mut self) -> Option<RgbImage> {
        self.live.then(|| RgbImage::new(self.width, self.height))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop_tracks(&mut self) {
        self.live = false;
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

/// Answers immediately with a full matte, except that the first request
/// optionally waits on `gate`. Calls from `fail_from_call` on (0-based) fail.
struct ScriptedModel {
    counters: Arc<Counters>,
    gate: Option<Arc<Notify>>,
    gate_all: bool,
    fail_from_call: Option<usize>,
}

#[async_trait::async_trait]
impl SegmentationModel for ScriptedModel {
    async fn segment(&self, frame: RgbImage) -> IncrusteResult<SegmentationResult> {
        let call = self.counters.segment_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if call == 0 || self.gate_all {
                gate.notified().await;
            }
        }
        if self.fail_from_call.is_some_and(|n| call >= n) {
            return Err(IncrusteError::segmentation("inference crashed"));
        }
        let (w, h) = frame.dimensions();
        Ok(SegmentationResult {
            mask: GrayImage::from_pixel(w, h, image::Luma([255])),
            image: frame,
        })
    }

    fn close(&self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedFactory {
    counters: Arc<Counters>,
    fail: bool,
    gate: Option<Arc<Notify>>,
    gate_all: bool,
    fail_from_call: Option<usize>,
}

impl ModelFactory for ScriptedFactory {
    fn create(
        &self,
        _options: &SegmentationOptions,
        _constraints: &CaptureConstraints,
    ) -> IncrusteResult<Arc<dyn SegmentationModel>> {
        if self.fail {
            return Err(IncrusteError::segmentation("weights missing"));
        }
        Ok(Arc::new(ScriptedModel {
            counters: self.counters.clone(),
            gate: self.gate.clone(),
            gate_all: self.gate_all,
            fail_from_call: self.fail_from_call,
        }))
    }
}

fn label() -> OverlayLabel {
    OverlayLabel::new("ACTEUR PRINCIPAL", "#ef4444")
}

fn fast(width: u32, height: u32) -> CaptureConstraints {
    CaptureConstraints {
        width,
        height,
        frame_rate: 100,
    }
}

fn options(max_in_flight: usize, selfie_mode: bool) -> CompositorOptions {
    CompositorOptions {
        segmentation: SegmentationOptions {
            model_selection: 1,
            selfie_mode,
        },
        pipeline: PipelineOptions {
            max_in_flight,
            stats_log_hz: 1,
        },
    }
}

fn scripted(
    counters: &Arc<Counters>,
    deny: bool,
    fail: bool,
    gate: Option<Arc<Notify>>,
    gate_all: bool,
    max_in_flight: usize,
) -> LiveCompositor {
    LiveCompositor::new(
        Arc::new(CountingCamera {
            counters: counters.clone(),
            deny,
        }),
        Arc::new(ScriptedFactory {
            counters: counters.clone(),
            fail,
            gate,
            gate_all,
            fail_from_call: None,
        }),
        options(max_in_flight, false),
        label(),
    )
}

/// A compositor whose model starts failing on call `fail_from_call`.
fn failing_midstream(counters: &Arc<Counters>, fail_from_call: usize) -> LiveCompositor {
    LiveCompositor::new(
        Arc::new(CountingCamera {
            counters: counters.clone(),
            deny: false,
        }),
        Arc::new(ScriptedFactory {
            counters: counters.clone(),
            fail: false,
            gate: None,
            gate_all: false,
            fail_from_call: Some(fail_from_call),
        }),
        options(1, false),
        label(),
    )
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

// Tests

#[tokio::test]
async fn denied_camera_is_terminal_and_never_retried() {
    let counters = Arc::new(Counters::default());
    let mut compositor = scripted(&counters, true, false, None, false, 1);
    let mut status_rx = compositor.subscribe();

    let status = compositor.start(fast(32, 32)).await;
    assert_eq!(
        status,
        CompositorStatus::Error("Camera unavailable: permission denied".into())
    );
    assert!(status_rx.has_changed().unwrap());
    assert!(status_rx.borrow_and_update().is_error());

    for active in [true, false, true] {
        compositor.set_active(active);
        compositor.start(fast(32, 32)).await;
    }
    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);

    let view = compositor.overlay_view();
    assert_eq!(view.opacity, 1.0);
    assert!(view.error_banner.unwrap().contains("permission denied"));
    assert!(!view.loading_indicator);
    assert!(compositor.presented_frame().is_none());
}

#[tokio::test]
async fn model_failure_releases_the_camera() {
    let counters = Arc::new(Counters::default());
    let mut compositor = scripted(&counters, false, true, None, false, 1);

    let status = compositor.start(fast(32, 32)).await;
    assert!(status.error_reason().unwrap().starts_with("Segmentation failed"));
    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn synthetic_camera_produces_a_cut_out() {
    let mut compositor = LiveCompositor::new(
        Arc::new(
            SyntheticCamera::new()
                .with_warmup_polls(0)
                .with_backdrop_frames(2),
        ),
        Arc::new(BackgroundDifferenceFactory::default()),
        options(1, false),
        label(),
    );

    assert_eq!(compositor.start(fast(64, 48)).await, CompositorStatus::Ready);
    assert!(compositor.presented_frame().is_none(), "hidden until active");

    compositor.set_active(true);
    let produced = wait_until(|| {
        compositor
            .presented_frame()
            .map(|frame| coverage(&frame) > 0.0)
            .unwrap_or(false)
    })
    .await;
    assert!(produced, "no composited frame within the deadline");

    let frame = compositor.presented_frame().unwrap();
    assert_eq!(frame.dimensions(), (64, 48));
    assert!(coverage(&frame) < 1.0, "backdrop must be cut away");

    compositor.shutdown().await;
    assert!(compositor.presented_frame().is_none());
    assert!(compositor.stats().results_committed > 0);
}

#[tokio::test]
async fn teardown_is_idempotent_and_releases_once() {
    let counters = Arc::new(Counters::default());
    let mut compositor = scripted(&counters, false, false, None, false, 1);
    assert_eq!(compositor.start(fast(16, 16)).await, CompositorStatus::Ready);
    assert!(wait_until(|| compositor.stats().results_committed > 0).await);

    compositor.stop();
    compositor.stop();
    compositor.shutdown().await;
    drop(compositor);

    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn results_after_teardown_are_discarded() {
    let counters = Arc::new(Counters::default());
    let gate = Arc::new(Notify::new());
    let mut compositor = scripted(&counters, false, false, Some(gate.clone()), true, 1);
    compositor.set_active(true);
    compositor.start(fast(16, 16)).await;

    assert!(wait_until(|| counters.segment_calls.load(Ordering::SeqCst) >= 1).await);
    compositor.shutdown().await;
    gate.notify_waiters();

    assert!(wait_until(|| compositor.stats().results_discarded >= 1).await);
    let stats = compositor.stats();
    assert_eq!(stats.results_committed, 0);
    assert_eq!(stats.requests_issued, 1);
    assert!(compositor.presented_frame().is_none());
}

#[tokio::test]
async fn in_flight_cap_drops_ticks_instead_of_queueing() {
    let counters = Arc::new(Counters::default());
    let gate = Arc::new(Notify::new());
    let mut compositor = scripted(&counters, false, false, Some(gate.clone()), true, 1);
    compositor.start(fast(16, 16)).await;

    assert!(wait_until(|| compositor.stats().frames_dropped >= 3).await);
    assert_eq!(compositor.stats().requests_issued, 1);

    gate.notify_waiters();
    compositor.shutdown().await;
}

#[tokio::test]
async fn stale_result_never_overwrites_newer_output() {
    let counters = Arc::new(Counters::default());
    let gate = Arc::new(Notify::new());
    // First request hangs; later ones answer at once.
    let mut compositor = scripted(&counters, false, false, Some(gate.clone()), false, 2);
    compositor.set_active(true);
    compositor.start(fast(16, 16)).await;

    assert!(wait_until(|| compositor.stats().results_committed >= 1).await);
    gate.notify_one();
    assert!(wait_until(|| compositor.stats().results_stale >= 1).await);
    assert!(compositor.presented_frame().is_some());

    compositor.shutdown().await;
}

#[tokio::test]
async fn camera_failure_leaves_timeline_usable() {
    let counters = Arc::new(Counters::default());
    let mut compositor = scripted(&counters, true, false, None, false, 1);
    compositor.start(fast(32, 32)).await;

    let performer = Performer::default();
    let mut timeline = SegmentTimeline::new();
    timeline.mark_in(1.0, &performer);
    timeline.mark_out(4.0);

    for t in [0.0, 1.0, 2.5, 4.0, 4.5] {
        let active = timeline.compute_active(t).active;
        compositor.set_active(active);
        assert_eq!(compositor.overlay_view().error_banner.is_some(), active);
    }
    assert_eq!(timeline.take_count(), 1);
    assert_eq!(timeline.segments()[0].end, 4.0);
}

#[tokio::test]
async fn inference_failure_midstream_is_terminal_and_releases_once() {
    let counters = Arc::new(Counters::default());
    let mut compositor = failing_midstream(&counters, 2);
    let mut status_rx = compositor.subscribe();
    compositor.set_active(true);

    assert_eq!(compositor.start(fast(16, 16)).await, CompositorStatus::Ready);
    assert!(wait_until(|| compositor.status().is_error()).await);
    let released = wait_until(|| {
        counters.stops.load(Ordering::SeqCst) == 1 && counters.closes.load(Ordering::SeqCst) == 1
    })
    .await;
    assert!(released, "camera and model not released after inference failure");

    assert!(status_rx.borrow_and_update().is_error());
    let reason = compositor.status().error_reason().unwrap().to_string();
    assert_eq!(reason, "Segmentation failed: inference crashed");

    let stats = compositor.stats();
    assert_eq!(stats.results_committed, 2);
    assert!(stats.model_errors >= 1);
    assert!(compositor.presented_frame().is_none());
    assert_eq!(compositor.overlay_view().error_banner.as_deref(), Some(reason.as_str()));

    // No restart and no second release.
    let again = compositor.start(fast(16, 16)).await;
    assert_eq!(again.error_reason(), Some(reason.as_str()));
    compositor.shutdown().await;
    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropping_a_running_compositor_releases_the_camera() {
    let counters = Arc::new(Counters::default());
    let mut compositor = scripted(&counters, false, false, None, false, 1);
    assert_eq!(compositor.start(fast(16, 16)).await, CompositorStatus::Ready);
    assert!(wait_until(|| compositor.stats().results_committed > 0).await);

    drop(compositor);

    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn absurd_frame_rate_is_refused_by_the_synthetic_camera() {
    let mut compositor = LiveCompositor::new(
        Arc::new(SyntheticCamera::new().with_warmup_polls(0)),
        Arc::new(BackgroundDifferenceFactory::default()),
        options(1, false),
        label(),
    );
    let request = CaptureConstraints {
        frame_rate: 2_000_000_000,
        ..fast(16, 16)
    };
    let status = compositor.start(request).await;
    assert!(status.error_reason().unwrap().starts_with("Camera unavailable"));
}

#[tokio::test]
async fn absurd_frame_rate_from_a_permissive_device_keeps_running() {
    let counters = Arc::new(Counters::default());
    let mut compositor = scripted(&counters, false, false, None, false, 1);
    compositor.set_active(true);
    let request = CaptureConstraints {
        frame_rate: u32::MAX,
        ..fast(16, 16)
    };

    assert_eq!(compositor.start(request).await, CompositorStatus::Ready);
    assert!(wait_until(|| compositor.stats().results_committed >= 3).await);
    assert_eq!(compositor.status(), CompositorStatus::Ready);
    assert!(compositor.presented_frame().is_some());

    compositor.shutdown().await;
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}
