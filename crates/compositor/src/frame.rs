//! Frame, matte and capture-constraint types.

use image::{GrayImage, RgbImage};
use incruste_common::config::CaptureDefaults;
use serde::{Deserialize, Serialize};

/// Resolution and frame-rate requested from the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl CaptureConstraints {
    /// Interval between frame-loop ticks. Never zero, whatever the rate.
    pub fn frame_interval(&self) -> std::time::Duration {
        let nanos = 1_000_000_000 / self.frame_rate.max(1) as u64;
        std::time::Duration::from_nanos(nanos.max(1))
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        CaptureDefaults::default().into()
    }
}

impl From<CaptureDefaults> for CaptureConstraints {
    fn from(d: CaptureDefaults) -> Self {
        Self {
            width: d.width,
            height: d.height,
            frame_rate: d.frame_rate,
        }
    }
}

/// What the segmentation model hands back for one request.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// Matte: 255 = performer, 0 = background.
    pub mask: GrayImage,

    /// The frame the mask belongs to (possibly mirrored by the model).
    pub image: RgbImage,
}
