//! Person-segmentation contracts and the built-in background-difference
//! model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use image::{imageops, GrayImage, Luma, RgbImage};
use incruste_common::config::SegmentationDefaults;
use incruste_common::error::{IncrusteError, IncrusteResult};

use crate::frame::{CaptureConstraints, SegmentationResult};

/// Options handed to the model at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationOptions {
    /// 0 = general, 1 = landscape.
    pub model_selection: u8,

    /// Mirror mask and image horizontally.
    pub selfie_mode: bool,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        SegmentationDefaults::default().into()
    }
}

impl From<SegmentationDefaults> for SegmentationOptions {
    fn from(d: SegmentationDefaults) -> Self {
        Self {
            model_selection: d.model_selection,
            selfie_mode: d.selfie_mode,
        }
    }
}

/// A black-box `frame -> (mask, frame)` transform.
///
/// Requests may be in flight concurrently; implementations must not make a
/// later request wait on an earlier one.
#[async_trait::async_trait]
pub trait SegmentationModel: Send + Sync {
    async fn segment(&self, frame: RgbImage) -> IncrusteResult<SegmentationResult>;

    /// Release the model. Called once at pipeline teardown.
    fn close(&self);

    fn name(&self) -> &str;
}

/// Builds a model for a pipeline.
pub trait ModelFactory: Send + Sync {
    fn create(
        &self,
        options: &SegmentationOptions,
        constraints: &CaptureConstraints,
    ) -> IncrusteResult<Arc<dyn SegmentationModel>>;
}

/// Foreground threshold on the summed per-channel difference.
const DEFAULT_DIFFERENCE_THRESHOLD: u32 = 60;

/// Segments by comparing each frame against a reference backdrop learned
/// from the first frames it sees.
///
/// Crude compared to a trained matting network, but it needs no weights and
/// behaves deterministically on the synthetic camera.
pub struct BackgroundDifferenceModel {
    options: SegmentationOptions,
    threshold: u32,
    calibration_frames: u32,
    state: Arc<Mutex<Calibration>>,
    closed: AtomicBool,
}

#[derive(Default)]
struct Calibration {
    /// Per-pixel running sum of calibration frames.
    accum: Vec<u32>,
    seen: u32,
    reference: Option<RgbImage>,
}

impl BackgroundDifferenceModel {
    pub fn new(options: SegmentationOptions) -> Self {
        Self {
            options,
            threshold: DEFAULT_DIFFERENCE_THRESHOLD,
            calibration_frames: 1,
            state: Arc::new(Mutex::new(Calibration::default())),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Number of frames averaged into the reference backdrop.
    pub fn with_calibration_frames(mut self, frames: u32) -> Self {
        self.calibration_frames = frames.max(1);
        self
    }

    /// Forget the learned backdrop.
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = Calibration::default();
        }
    }
}

/// Compare `frame` against the learned backdrop, or feed it into calibration.
fn matte(
    state: &Mutex<Calibration>,
    threshold: u32,
    calibration_frames: u32,
    frame: &RgbImage,
) -> IncrusteResult<GrayImage> {
    let mut state = state
        .lock()
        .map_err(|_| IncrusteError::segmentation("calibration state poisoned"))?;

    if let Some(reference) = state.reference.as_ref() {
        if reference.dimensions() != frame.dimensions() {
            return Err(IncrusteError::segmentation(format!(
                "frame size {:?} differs from calibrated {:?}",
                frame.dimensions(),
                reference.dimensions()
            )));
        }
        return Ok(GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let a = frame.get_pixel(x, y).0;
            let b = reference.get_pixel(x, y).0;
            let diff: u32 = a
                .iter()
                .zip(b.iter())
                .map(|(p, q)| (*p as i32 - *q as i32).unsigned_abs())
                .sum();
            Luma([if diff > threshold { 255 } else { 0 }])
        }));
    }

    // Still calibrating: accumulate and report an empty matte.
    let raw = frame.as_raw();
    if state.accum.len() != raw.len() {
        state.accum = vec![0; raw.len()];
        state.seen = 0;
    }
    for (acc, px) in state.accum.iter_mut().zip(raw) {
        *acc += *px as u32;
    }
    state.seen += 1;
    if state.seen >= calibration_frames {
        let seen = state.seen;
        let averaged: Vec<u8> = state.accum.iter().map(|v| (v / seen) as u8).collect();
        state.reference = RgbImage::from_raw(frame.width(), frame.height(), averaged);
        state.accum.clear();
        tracing::debug!(frames = seen, "Background reference calibrated");
    }
    Ok(GrayImage::new(frame.width(), frame.height()))
}

#[async_trait::async_trait]
impl SegmentationModel for BackgroundDifferenceModel {
    async fn segment(&self, frame: RgbImage) -> IncrusteResult<SegmentationResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(IncrusteError::segmentation("model is closed"));
        }
        let state = Arc::clone(&self.state);
        let threshold = self.threshold;
        let calibration_frames = self.calibration_frames;
        let selfie_mode = self.options.selfie_mode;

        // Per-pixel work stays off the async workers.
        tokio::task::spawn_blocking(move || -> IncrusteResult<SegmentationResult> {
            let mask = matte(&state, threshold, calibration_frames, &frame)?;
            if selfie_mode {
                Ok(SegmentationResult {
                    mask: imageops::flip_horizontal(&mask),
                    image: imageops::flip_horizontal(&frame),
                })
            } else {
                Ok(SegmentationResult { mask, image: frame })
            }
        })
        .await
        .map_err(|e| IncrusteError::segmentation(format!("matte worker join failed: {e}")))?
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("Background difference model closed");
        }
    }

    fn name(&self) -> &str {
        "background-difference"
    }
}

/// Factory for [`BackgroundDifferenceModel`].
#[derive(Debug, Clone, Default)]
pub struct BackgroundDifferenceFactory {
    pub threshold: Option<u32>,
    pub calibration_frames: Option<u32>,
}

impl ModelFactory for BackgroundDifferenceFactory {
    fn create(
        &self,
        options: &SegmentationOptions,
        constraints: &CaptureConstraints,
    ) -> IncrusteResult<Arc<dyn SegmentationModel>> {
        if options.model_selection > 1 {
            return Err(IncrusteError::segmentation(format!(
                "unknown model selection {}",
                options.model_selection
            )));
        }
        let mut model = BackgroundDifferenceModel::new(*options);
        if let Some(t) = self.threshold {
            model = model.with_threshold(t);
        }
        if let Some(n) = self.calibration_frames {
            model = model.with_calibration_frames(n);
        }
        tracing::info!(
            model = model.name(),
            selection = options.model_selection,
            selfie = options.selfie_mode,
            width = constraints.width,
            height = constraints.height,
            "Segmentation model ready"
        );
        Ok(Arc::new(model))
    }
}
