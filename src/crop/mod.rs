//! Interior-rectangle cropping of the warped panorama (stage 7).
//!
//! The crop window is computed once from the LOW-tier warped masks and
//! reapplied, rescaled, to every other tier. Recomputing per tier would
//! round differently and misalign the resolutions.

mod lir;

pub use lir::largest_interior_rectangle;

use crate::error::{Result, StitchError};
use crate::image::{ImageF32, MaskU8};
use crate::types::{PointI, Rect, SizeI};
use log::debug;

/// Frozen crop geometry: the largest interior rectangle of the LOW-tier
/// panorama coverage, in LOW-tier panorama coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Cropper {
    rect: Rect,
}

impl Cropper {
    /// Cropper replaying a previously computed window (incremental
    /// re-blend path).
    pub fn from_rect(rect: Rect) -> Cropper {
        Cropper { rect }
    }

    /// Determine the crop window from the LOW-tier warped masks and their
    /// corners.
    pub fn prepare(low_masks: &[MaskU8], low_corners: &[PointI]) -> Result<Cropper> {
        if low_masks.is_empty() || low_masks.len() != low_corners.len() {
            return Err(StitchError::UnreadyState(
                "warped low-resolution masks are required to prepare the cropper",
            ));
        }

        // Panorama bounding box over all footprints.
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for (mask, corner) in low_masks.iter().zip(low_corners) {
            min_x = min_x.min(corner.x);
            min_y = min_y.min(corner.y);
            max_x = max_x.max(corner.x + mask.w as i32);
            max_y = max_y.max(corner.y + mask.h as i32);
        }

        // Union coverage mask of the panorama.
        let width = (max_x - min_x) as usize;
        let height = (max_y - min_y) as usize;
        let mut coverage = MaskU8::new(width, height);
        for (mask, corner) in low_masks.iter().zip(low_corners) {
            let ox = (corner.x - min_x) as usize;
            let oy = (corner.y - min_y) as usize;
            for y in 0..mask.h {
                let src = mask.row(y);
                let dst = coverage.row_mut(oy + y);
                for (x, &v) in src.iter().enumerate() {
                    if v != 0 {
                        dst[ox + x] = 255;
                    }
                }
            }
        }

        let local = largest_interior_rectangle(&coverage);
        if local.is_empty() {
            return Err(StitchError::GeometricDegeneracy(
                "no interior rectangle: warped images do not form a valid panorama".into(),
            ));
        }
        let rect = Rect::new(local.x + min_x, local.y + min_y, local.w, local.h);
        debug!("crop window {rect:?} (low-tier panorama coordinates)");
        Ok(Cropper { rect })
    }

    /// Crop window in LOW-tier panorama coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Crop window rescaled to a tier whose size is `aspect` times LOW.
    pub fn rect_at(&self, aspect: f32) -> Rect {
        if (aspect - 1.0).abs() < f32::EPSILON {
            self.rect
        } else {
            self.rect.scaled(aspect)
        }
    }

    /// Clip one warped image (any tier, `aspect` relative to LOW) to the
    /// crop window translated into its frame via `corner`.
    pub fn crop_image(&self, image: &ImageF32, corner: PointI, aspect: f32) -> Result<ImageF32> {
        let window = self.window_in_frame(image.w, image.h, corner, aspect)?;
        Ok(image.crop(
            window.x as usize,
            window.y as usize,
            window.w as usize,
            window.h as usize,
        ))
    }

    /// Clip one warped mask, same geometry as [`Cropper::crop_image`].
    pub fn crop_mask(&self, mask: &MaskU8, corner: PointI, aspect: f32) -> Result<MaskU8> {
        let window = self.window_in_frame(mask.w, mask.h, corner, aspect)?;
        Ok(mask.crop(
            window.x as usize,
            window.y as usize,
            window.w as usize,
            window.h as usize,
        ))
    }

    /// Recompute corners and sizes after cropping: the crop window's corner
    /// becomes the panorama origin.
    pub fn crop_rois(
        &self,
        corners: &[PointI],
        sizes: &[SizeI],
        aspect: f32,
    ) -> Result<(Vec<PointI>, Vec<SizeI>)> {
        let window = self.rect_at(aspect);
        let mut new_corners = Vec::with_capacity(corners.len());
        let mut new_sizes = Vec::with_capacity(sizes.len());
        for (corner, size) in corners.iter().zip(sizes) {
            let footprint = Rect::from_corner_size(*corner, *size);
            let clipped = footprint.intersect(&window);
            if clipped.is_empty() {
                return Err(StitchError::GeometricDegeneracy(format!(
                    "warped footprint at {corner:?} lies outside the crop window"
                )));
            }
            new_corners.push(PointI::new(clipped.x - window.x, clipped.y - window.y));
            new_sizes.push(clipped.size());
        }
        Ok((new_corners, new_sizes))
    }

    /// Crop window expressed in one image's local pixel coordinates.
    fn window_in_frame(
        &self,
        w: usize,
        h: usize,
        corner: PointI,
        aspect: f32,
    ) -> Result<Rect> {
        let window = self.rect_at(aspect);
        let footprint = Rect::new(corner.x, corner.y, w as i32, h as i32);
        let clipped = footprint.intersect(&window);
        if clipped.is_empty() {
            return Err(StitchError::GeometricDegeneracy(format!(
                "warped footprint at {corner:?} lies outside the crop window"
            )));
        }
        Ok(Rect::new(
            clipped.x - corner.x,
            clipped.y - corner.y,
            clipped.w,
            clipped.h,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_strips_crop_to_union_interior() {
        // Two 10x10 footprints side by side, overlapping by 4 columns.
        let masks = vec![MaskU8::filled(10, 10), MaskU8::filled(10, 10)];
        let corners = vec![PointI::new(0, 0), PointI::new(6, 0)];
        let cropper = Cropper::prepare(&masks, &corners).unwrap();
        assert_eq!(cropper.rect(), Rect::new(0, 0, 16, 10));
    }

    #[test]
    fn diagonal_offset_shrinks_window() {
        let masks = vec![MaskU8::filled(10, 10), MaskU8::filled(10, 10)];
        let corners = vec![PointI::new(0, 0), PointI::new(5, 5)];
        let cropper = Cropper::prepare(&masks, &corners).unwrap();
        let rect = cropper.rect();
        // The union is an L/diagonal shape; the interior rectangle cannot
        // span the full 15x15 bounding box.
        assert!(rect.w < 15 || rect.h < 15);
        assert!(!rect.is_empty());
    }

    #[test]
    fn cropped_rois_are_contained() {
        let masks = vec![MaskU8::filled(10, 10), MaskU8::filled(10, 10)];
        let corners = vec![PointI::new(0, 0), PointI::new(6, 0)];
        let cropper = Cropper::prepare(&masks, &corners).unwrap();
        let sizes = vec![SizeI::new(10, 10), SizeI::new(10, 10)];
        let (new_corners, new_sizes) = cropper.crop_rois(&corners, &sizes, 1.0).unwrap();
        for (corner, size) in new_corners.iter().zip(&new_sizes) {
            assert!(corner.x >= 0 && corner.y >= 0);
            assert!(corner.x + size.w <= 16);
            assert!(corner.y + size.h <= 10);
            assert!(size.area() <= SizeI::new(10, 10).area());
        }
    }

    #[test]
    fn crop_scales_with_aspect() {
        let masks = vec![MaskU8::filled(10, 10)];
        let corners = vec![PointI::new(0, 0)];
        let cropper = Cropper::prepare(&masks, &corners).unwrap();
        let final_rect = cropper.rect_at(3.0);
        assert_eq!(final_rect, Rect::new(0, 0, 30, 30));
    }

    #[test]
    fn empty_input_is_unready() {
        let err = Cropper::prepare(&[], &[]).unwrap_err();
        assert!(matches!(err, StitchError::UnreadyState(_)));
    }
}
