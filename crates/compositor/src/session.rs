//! Live compositor session.

use std::sync::Arc;

use image::RgbaImage;
use incruste_common::config::AppConfig;
use incruste_common::error::{IncrusteError, IncrusteResult};
use tokio::sync::watch;

use crate::capture::{CaptureProvider, CaptureStream};
use crate::frame::CaptureConstraints;
use crate::overlay::{OverlayLabel, OverlayView};
use crate::pipeline::{PipelineHandle, PipelineOptions, PipelineStats};
use crate::segmentation::{ModelFactory, SegmentationOptions};
use crate::status::{CompositorStatus, StatusCell};

/// Options for a compositor session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositorOptions {
    pub segmentation: SegmentationOptions,
    pub pipeline: PipelineOptions,
}

impl CompositorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            segmentation: config.segmentation.into(),
            pipeline: config.pipeline.into(),
        }
    }
}

/// Stops the stream's tracks unless ownership is handed on.
struct StreamGuard(Option<Box<dyn CaptureStream>>);

impl StreamGuard {
    fn into_inner(mut self) -> Option<Box<dyn CaptureStream>> {
        self.0.take()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Some(mut stream) = self.0.take() {
            tracing::debug!("Releasing capture stream after failed setup");
            stream.stop_tracks();
        }
    }
}

/// Camera-to-overlay compositor.
///
/// Construction does no work; [`LiveCompositor::start`] acquires the camera
/// and model. All setup failures end in [`CompositorStatus::Error`] and are
/// never returned to the caller.
pub struct LiveCompositor {
    provider: Arc<dyn CaptureProvider>,
    factory: Arc<dyn ModelFactory>,
    options: CompositorOptions,
    label: OverlayLabel,
    status: Arc<StatusCell>,
    active: bool,
    started: bool,
    stopped: bool,
    pipeline: Option<PipelineHandle>,
}

impl LiveCompositor {
    pub fn new(
        provider: Arc<dyn CaptureProvider>,
        factory: Arc<dyn ModelFactory>,
        options: CompositorOptions,
        label: OverlayLabel,
    ) -> Self {
        Self {
            provider,
            factory,
            options,
            label,
            status: Arc::new(StatusCell::new()),
            active: false,
            started: false,
            stopped: false,
            pipeline: None,
        }
    }

    /// Acquire the camera, build the model and start the frame loop.
    ///
    /// Only the first call does anything. Later calls (including after an
    /// error or a stop) return the current status without touching the
    /// device.
    pub async fn start(&mut self, constraints: CaptureConstraints) -> CompositorStatus {
        if self.started {
            tracing::debug!(status = ?self.status(), "Compositor already started; ignoring");
            return self.status();
        }
        self.started = true;

        match self.try_start(constraints).await {
            Ok(handle) => {
                self.pipeline = Some(handle);
                self.status.set(CompositorStatus::Ready);
                tracing::info!(provider = self.provider.name(), "Live compositor ready");
            }
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), "Compositor setup failed: {}", e);
                self.status.fail(e.user_reason());
            }
        }
        self.status()
    }

    async fn try_start(&self, constraints: CaptureConstraints) -> IncrusteResult<PipelineHandle> {
        let stream = self.provider.open(&constraints).await?;
        let guard = StreamGuard(Some(stream));

        let model = self.factory.create(&self.options.segmentation, &constraints)?;

        let stream = guard
            .into_inner()
            .ok_or_else(|| IncrusteError::compositor("capture stream lost"))?;
        Ok(PipelineHandle::spawn(
            stream,
            model,
            constraints.frame_interval(),
            self.options.pipeline,
            self.status.clone(),
        ))
    }

    /// Show or hide the overlay. The pipeline keeps running either way.
    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            tracing::debug!(active, "Compositor visibility changed");
            self.active = active;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn status(&self) -> CompositorStatus {
        self.status.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<CompositorStatus> {
        self.status.subscribe()
    }

    pub fn label(&self) -> &OverlayLabel {
        &self.label
    }

    pub fn set_label(&mut self, label: OverlayLabel) {
        self.label = label;
    }

    /// Whether the overlay should be drawn at all. A stopped compositor
    /// shows nothing, whatever its visibility flag says.
    fn shown(&self) -> bool {
        self.active && !self.stopped
    }

    /// The composited frame, only while shown and ready.
    pub fn presented_frame(&self) -> Option<RgbaImage> {
        if !self.shown() || !self.status().is_ready() {
            return None;
        }
        self.pipeline.as_ref()?.output().snapshot()
    }

    pub fn overlay_view(&self) -> OverlayView {
        OverlayView::compute(&self.status(), self.shown(), &self.label)
    }

    pub fn stats(&self) -> PipelineStats {
        self.pipeline
            .as_ref()
            .map(PipelineHandle::stats)
            .unwrap_or_default()
    }

    /// Tear down the pipeline. Idempotent; a stopped compositor cannot be
    /// started again.
    pub fn stop(&mut self) {
        self.started = true;
        self.stopped = true;
        if let Some(pipeline) = self.pipeline.as_mut() {
            if !pipeline.is_disposed() {
                tracing::info!("Stopping live compositor");
                pipeline.dispose();
            }
        }
    }

    /// Stop and wait for the frame loop to exit.
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.shutdown().await;
        }
    }
}

impl Drop for LiveCompositor {
    fn drop(&mut self) {
        self.stop();
    }
}
