//! Capture-device contracts and the built-in synthetic camera.

use image::{Rgb, RgbImage};
use incruste_common::error::{IncrusteError, IncrusteResult};

use crate::frame::CaptureConstraints;

/// Grants access to a video capture device.
#[async_trait::async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Request exclusive access to a device matching `constraints`.
    ///
    /// Suspends while the user decides on the permission prompt. Fails with
    /// [`IncrusteError::CaptureUnavailable`] when access is denied or no
    /// device matches.
    async fn open(&self, constraints: &CaptureConstraints)
        -> IncrusteResult<Box<dyn CaptureStream>>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// A live camera stream owned by one compositor.
pub trait CaptureStream: Send {
    /// The next decodable frame, or `None` if nothing is ready yet.
    /// Never blocks.
    fn next_frame(&mut self) -> Option<RgbImage>;

    /// Negotiated (width, height).
    fn resolution(&self) -> (u32, u32);

    /// Stop every track of the stream. Must tolerate repeated calls.
    fn stop_tracks(&mut self);

    fn is_live(&self) -> bool;
}

/// Synthetic camera: a static backdrop with a moving "performer" block.
///
/// Useful wherever no real device is present (CLI preview, tests). The
/// first `backdrop_frames` frames show the empty set so background models
/// can calibrate.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    max_width: u32,
    max_height: u32,
    max_frame_rate: u32,
    permission_granted: bool,
    warmup_polls: u32,
    backdrop_frames: u64,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            max_frame_rate: 240,
            permission_granted: true,
            warmup_polls: 1,
            backdrop_frames: 3,
        }
    }

    /// A camera whose permission prompt is always refused.
    pub fn denied() -> Self {
        Self {
            permission_granted: false,
            ..Self::new()
        }
    }

    /// Largest resolution the device can satisfy.
    pub fn with_max_resolution(mut self, width: u32, height: u32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    /// Highest frame rate the device can deliver.
    pub fn with_max_frame_rate(mut self, fps: u32) -> Self {
        self.max_frame_rate = fps;
        self
    }

    /// Number of polls that return no frame after opening.
    pub fn with_warmup_polls(mut self, polls: u32) -> Self {
        self.warmup_polls = polls;
        self
    }

    pub fn with_backdrop_frames(mut self, frames: u64) -> Self {
        self.backdrop_frames = frames;
        self
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureProvider for SyntheticCamera {
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> IncrusteResult<Box<dyn CaptureStream>> {
        if !self.permission_granted {
            return Err(IncrusteError::capture_unavailable(
                "permission to use the camera was denied",
            ));
        }
        if constraints.width == 0
            || constraints.height == 0
            || constraints.width > self.max_width
            || constraints.height > self.max_height
        {
            return Err(IncrusteError::capture_unavailable(format!(
                "no device supports {}x{} (max {}x{})",
                constraints.width, constraints.height, self.max_width, self.max_height
            )));
        }
        if constraints.frame_rate > self.max_frame_rate {
            return Err(IncrusteError::capture_unavailable(format!(
                "no device delivers {} fps (max {})",
                constraints.frame_rate, self.max_frame_rate
            )));
        }

        tracing::info!(
            width = constraints.width,
            height = constraints.height,
            fps = constraints.frame_rate,
            "Synthetic camera opened"
        );

        Ok(Box::new(SyntheticStream {
            width: constraints.width,
            height: constraints.height,
            warmup_polls: self.warmup_polls,
            backdrop_frames: self.backdrop_frames,
            frame_index: 0,
            live: true,
        }))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    warmup_polls: u32,
    backdrop_frames: u64,
    frame_index: u64,
    live: bool,
}

impl SyntheticStream {
    fn render(&self) -> RgbImage {
        let (w, h) = (self.width, self.height);
        let mut img = RgbImage::from_fn(w, h, |x, y| {
            // Dim blue-to-green studio backdrop.
            let gx = (x * 60 / w.max(1)) as u8;
            let gy = (y * 60 / h.max(1)) as u8;
            Rgb([20, 40 + gy, 80 + gx])
        });

        if self.frame_index >= self.backdrop_frames {
            let block_w = (w / 4).max(1);
            let block_h = (h / 2).max(1);
            let travel = w.saturating_sub(block_w).max(1) as u64;
            let step = (self.frame_index - self.backdrop_frames) * 4;
            let left = (step % travel) as u32;
            let top = h / 4;
            for y in top..(top + block_h).min(h) {
                for x in left..(left + block_w).min(w) {
                    img.put_pixel(x, y, Rgb([230, 180, 150]));
                }
            }
        }
        img
    }
}

impl CaptureStream for SyntheticStream {
    fn next_frame(&mut self) -> Option<RgbImage> {
        if !self.live {
            return None;
        }
        if self.warmup_polls > 0 {
            self.warmup_polls -= 1;
            return None;
        }
        let frame = self.render();
        self.frame_index += 1;
        Some(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop_tracks(&mut self) {
        if self.live {
            self.live = false;
            tracing::info!(frames = self.frame_index, "Synthetic camera stopped");
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(width: u32, height: u32) -> CaptureConstraints {
        CaptureConstraints {
            width,
            height,
            frame_rate: 30,
        }
    }

    #[tokio::test]
    async fn denied_camera_reports_capture_unavailable() {
        let err = SyntheticCamera::denied()
            .open(&constraints(640, 480))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, IncrusteError::CaptureUnavailable { .. }));
    }

    #[tokio::test]
    async fn oversized_request_has_no_matching_device() {
        let camera = SyntheticCamera::new().with_max_resolution(320, 240);
        assert!(camera.open(&constraints(640, 480)).await.is_err());
    }

    #[tokio::test]
    async fn absurd_frame_rate_has_no_matching_device() {
        let request = CaptureConstraints {
            frame_rate: 2_000_000_000,
            ..constraints(64, 48)
        };
        let err = SyntheticCamera::new().open(&request).await.err().unwrap();
        assert!(matches!(err, IncrusteError::CaptureUnavailable { .. }));

        let camera = SyntheticCamera::new().with_max_frame_rate(60);
        assert!(camera.open(&constraints(64, 48)).await.is_ok());
    }

    #[tokio::test]
    async fn warmup_then_frames_at_requested_size() {
        let camera = SyntheticCamera::new().with_warmup_polls(2);
        let mut stream = camera.open(&constraints(64, 48)).await.unwrap();
        assert!(stream.next_frame().is_none());
        assert!(stream.next_frame().is_none());
        let frame = stream.next_frame().unwrap();
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(stream.resolution(), (64, 48));
    }

    #[tokio::test]
    async fn performer_appears_after_backdrop_frames() {
        let camera = SyntheticCamera::new()
            .with_warmup_polls(0)
            .with_backdrop_frames(1);
        let mut stream = camera.open(&constraints(64, 48)).await.unwrap();
        let backdrop = stream.next_frame().unwrap();
        let with_performer = stream.next_frame().unwrap();
        assert_ne!(backdrop, with_performer);
        assert_eq!(*with_performer.get_pixel(4, 24), Rgb([230, 180, 150]));
    }

    #[tokio::test]
    async fn stopped_stream_yields_nothing() {
        let mut stream = SyntheticCamera::new()
            .with_warmup_polls(0)
            .open(&constraints(32, 32))
            .await
            .unwrap();
        stream.stop_tracks();
        stream.stop_tracks();
        assert!(!stream.is_live());
        assert!(stream.next_frame().is_none());
    }
}
