//! Error types shared across Ciné-Incruste crates.

/// Top-level error type for Ciné-Incruste operations.
///
/// Timeline editing never produces one of these: an out-of-range delete or a
/// mark-out without a prior mark-in is a silent no-op.
#[derive(Debug, thiserror::Error)]
pub enum IncrusteError {
    /// Camera permission denied or no device matches the constraints.
    #[error("Capture unavailable: {message}")]
    CaptureUnavailable { message: String },

    /// Segmentation model construction or inference failed.
    #[error("Segmentation model failure: {message}")]
    SegmentationModel { message: String },

    #[error("Compositor error: {message}")]
    Compositor { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using IncrusteError.
pub type IncrusteResult<T> = Result<T, IncrusteError>;

impl IncrusteError {
    pub fn capture_unavailable(msg: impl Into<String>) -> Self {
        Self::CaptureUnavailable {
            message: msg.into(),
        }
    }

    pub fn segmentation(msg: impl Into<String>) -> Self {
        Self::SegmentationModel {
            message: msg.into(),
        }
    }

    pub fn compositor(msg: impl Into<String>) -> Self {
        Self::Compositor {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Human-readable reason suitable for a status banner.
    pub fn user_reason(&self) -> String {
        match self {
            Self::CaptureUnavailable { message } => format!("Camera unavailable: {message}"),
            Self::SegmentationModel { message } => format!("Segmentation failed: {message}"),
            other => other.to_string(),
        }
    }
}
