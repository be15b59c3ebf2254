//! The shared output raster and its sequence guard.
//!
//! Every segmentation request is tagged with a sequence number when it is
//! issued. A result may only replace the presented raster if its number is
//! still the latest one issued; anything older is stale. Once the raster is
//! disposed every result is refused.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use image::RgbaImage;

use crate::composite::composite_source_in;
use crate::frame::SegmentationResult;

/// What happened to a result offered to the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// A newer request was issued after this one.
    Stale,
    /// Teardown already began.
    Disposed,
}

struct RasterState {
    image: Option<RgbaImage>,
    committed_seq: u64,
    disposed: bool,
}

/// Output target shared between the frame loop and result handlers.
pub struct SharedOutput {
    width: u32,
    height: u32,
    latest_issued: AtomicU64,
    state: Mutex<RasterState>,
}

impl SharedOutput {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            latest_issued: AtomicU64::new(0),
            state: Mutex::new(RasterState {
                image: None,
                committed_seq: 0,
                disposed: false,
            }),
        }
    }

    /// Allocate the next sequence number (starting at 1).
    pub fn issue_next(&self) -> u64 {
        self.latest_issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_issued(&self) -> u64 {
        self.latest_issued.load(Ordering::SeqCst)
    }

    /// Sequence number of the raster currently presented (0 = none yet).
    pub fn committed_seq(&self) -> u64 {
        self.state.lock().map(|s| s.committed_seq).unwrap_or(0)
    }

    /// Composite `result` and present it if `seq` is still the latest.
    pub fn commit(&self, seq: u64, result: &SegmentationResult) -> CommitOutcome {
        if self.is_disposed() {
            return CommitOutcome::Disposed;
        }
        if seq != self.latest_issued() {
            return CommitOutcome::Stale;
        }

        let composited = composite_source_in(result, self.width, self.height);

        let Ok(mut state) = self.state.lock() else {
            return CommitOutcome::Disposed;
        };
        if state.disposed {
            return CommitOutcome::Disposed;
        }
        // Re-check: a newer request may have been issued while compositing.
        if seq != self.latest_issued() || seq <= state.committed_seq {
            return CommitOutcome::Stale;
        }
        state.image = Some(composited);
        state.committed_seq = seq;
        CommitOutcome::Committed
    }

    /// Copy of the presented raster, if any result has been committed.
    pub fn snapshot(&self) -> Option<RgbaImage> {
        let state = self.state.lock().ok()?;
        if state.disposed {
            return None;
        }
        state.image.clone()
    }

    /// Refuse all further writes and free the raster.
    pub fn dispose(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.disposed = true;
            state.image = None;
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().map(|s| s.disposed).unwrap_or(true)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    fn full_mask_result() -> SegmentationResult {
        SegmentationResult {
            mask: GrayImage::from_pixel(4, 4, Luma([255])),
            image: RgbImage::new(4, 4),
        }
    }

    #[test]
    fn sequence_numbers_start_at_one() {
        let out = SharedOutput::new(4, 4);
        assert_eq!(out.issue_next(), 1);
        assert_eq!(out.issue_next(), 2);
        assert_eq!(out.latest_issued(), 2);
    }

    #[test]
    fn stale_result_is_discarded() {
        let out = SharedOutput::new(4, 4);
        let first = out.issue_next();
        let second = out.issue_next();

        assert_eq!(out.commit(first, &full_mask_result()), CommitOutcome::Stale);
        assert!(out.snapshot().is_none());

        assert_eq!(out.commit(second, &full_mask_result()), CommitOutcome::Committed);
        assert_eq!(out.committed_seq(), second);
        assert!(out.snapshot().is_some());
    }

    #[test]
    fn same_sequence_cannot_commit_twice() {
        let out = SharedOutput::new(4, 4);
        let seq = out.issue_next();
        assert_eq!(out.commit(seq, &full_mask_result()), CommitOutcome::Committed);
        assert_eq!(out.commit(seq, &full_mask_result()), CommitOutcome::Stale);
    }

    #[test]
    fn disposed_raster_refuses_late_results() {
        let out = SharedOutput::new(4, 4);
        let seq = out.issue_next();
        out.dispose();
        assert_eq!(out.commit(seq, &full_mask_result()), CommitOutcome::Disposed);
        assert!(out.snapshot().is_none());
        assert!(out.is_disposed());
    }
}
