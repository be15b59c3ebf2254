//! Matte compositing.
//!
//! Two steps: draw the matte into an empty raster, then draw the camera
//! frame with source-in blending so only the matte-covered pixels keep
//! colour.

use image::{imageops, GrayImage, Rgba, RgbaImage, RgbImage};

use crate::frame::SegmentationResult;

/// Composite one segmentation result into a `width` x `height` raster.
pub fn composite_source_in(result: &SegmentationResult, width: u32, height: u32) -> RgbaImage {
    let mut target = RgbaImage::new(width, height);
    composite_into(&mut target, &result.mask, &result.image);
    target
}

/// Composite into an existing raster, scaling mask and frame to fit.
pub fn composite_into(target: &mut RgbaImage, mask: &GrayImage, frame: &RgbImage) {
    let (w, h) = target.dimensions();
    if w == 0 || h == 0 {
        return;
    }

    // Clear, then lay down the matte as destination alpha.
    let mask = fit_gray(mask, w, h);
    for (dst, m) in target.pixels_mut().zip(mask.pixels()) {
        let a = m.0[0];
        *dst = Rgba([a, a, a, a]);
    }

    // source-in: keep destination alpha, take colour from the frame.
    let frame = fit_rgb(frame, w, h);
    for (dst, src) in target.pixels_mut().zip(frame.pixels()) {
        let alpha = dst.0[3];
        *dst = if alpha == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([src.0[0], src.0[1], src.0[2], alpha])
        };
    }
}

/// Fraction of the raster covered by the matte (alpha > 0).
pub fn coverage(raster: &RgbaImage) -> f64 {
    let total = raster.width() as u64 * raster.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let covered = raster.pixels().filter(|p| p.0[3] > 0).count() as u64;
    covered as f64 / total as f64
}

fn fit_gray(img: &GrayImage, w: u32, h: u32) -> std::borrow::Cow<'_, GrayImage> {
    if img.dimensions() == (w, h) {
        std::borrow::Cow::Borrowed(img)
    } else {
        std::borrow::Cow::Owned(imageops::resize(img, w, h, imageops::FilterType::Triangle))
    }
}

fn fit_rgb(img: &RgbImage, w: u32, h: u32) -> std::borrow::Cow<'_, RgbImage> {
    if img.dimensions() == (w, h) {
        std::borrow::Cow::Borrowed(img)
    } else {
        std::borrow::Cow::Owned(imageops::resize(img, w, h, imageops::FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn result(mask: GrayImage, image: RgbImage) -> SegmentationResult {
        SegmentationResult { mask, image }
    }

    #[test]
    fn only_matte_pixels_keep_colour() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, Luma([255]));
        mask.put_pixel(2, 1, Luma([128]));
        let frame = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));

        let out = composite_source_in(&result(mask, frame), 4, 4);
        assert_eq!(out.get_pixel(1, 1).0, [10, 20, 30, 255]);
        assert_eq!(out.get_pixel(2, 1).0, [10, 20, 30, 128]);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert!((coverage(&out) - 2.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_sizes_are_scaled_to_raster() {
        let mask = GrayImage::from_pixel(2, 2, Luma([255]));
        let frame = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let out = composite_source_in(&result(mask, frame), 4, 4);
        assert_eq!(out.dimensions(), (4, 4));
        assert!(out.pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn empty_raster_is_left_alone() {
        let mut target = RgbaImage::new(0, 0);
        composite_into(&mut target, &GrayImage::new(2, 2), &RgbImage::new(2, 2));
        assert_eq!(coverage(&target), 0.0);
    }
}
