//! What the presentation layer should draw over the video.

use crate::status::CompositorStatus;

/// Floating label naming the performer being composited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLabel {
    pub text: String,
    pub color: String,
}

impl OverlayLabel {
    pub fn new(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: color.into(),
        }
    }
}

/// Derived overlay state for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView {
    /// 1.0 while active, 0.0 otherwise. The pipeline runs either way.
    pub opacity: f32,
    pub label: OverlayLabel,
    /// "Starting camera" indicator.
    pub loading_indicator: bool,
    /// Error banner text.
    pub error_banner: Option<String>,
}

impl OverlayView {
    pub fn compute(status: &CompositorStatus, active: bool, label: &OverlayLabel) -> Self {
        Self {
            opacity: if active { 1.0 } else { 0.0 },
            label: label.clone(),
            loading_indicator: active && matches!(status, CompositorStatus::Initializing),
            error_banner: if active {
                status.error_reason().map(str::to_string)
            } else {
                None
            },
        }
    }

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}
