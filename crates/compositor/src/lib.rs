//! Ciné-Incruste Live Compositor
//!
//! Turns the operator's camera feed into a background-removed overlay that
//! the host shows while the play-head sits inside a segment.
//!
//! # Pipeline Architecture
//!
//! ```text
//! CaptureProvider ──open──► CaptureStream
//!                                │  next_frame() every tick
//!                                ▼
//!                   frame loop (seq = n) ──spawn──► SegmentationModel
//!                                                        │ (mask, image)
//!                                                        ▼
//!                                 SharedOutput::commit(n)  [latest-issued guard]
//!                                                        │ source-in composite
//!                                                        ▼
//!                                      RgbaImage ── gated by set_active()
//! ```
//!
//! Capture stream, model handle and loop cancellation are bundled in one
//! [`pipeline::PipelineHandle`] whose `dispose` runs exactly once.

pub mod capture;
pub mod composite;
pub mod frame;
pub mod overlay;
pub mod pipeline;
pub mod raster;
pub mod segmentation;
pub mod session;
pub mod status;

pub use frame::*;
pub use overlay::{OverlayLabel, OverlayView};
pub use session::*;
pub use status::CompositorStatus;
