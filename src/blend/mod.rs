//! Final composition of seam-masked images onto the panorama canvas
//! (stage 10).
//!
//! After seam carving the masks partition the panorama, so composition is
//! a masked copy: each fed pixel lands at `corner + (x, y)` relative to the
//! destination region. The coverage mask returned by `blend` records which
//! canvas pixels received content.

use crate::error::{Result, StitchError};
use crate::image::{ImageF32, MaskU8};
use crate::types::{PointI, Rect, SizeI};
use log::debug;

/// Accumulating panorama canvas.
#[derive(Clone, Debug, Default)]
pub struct Blender {
    dst: Option<Canvas>,
}

#[derive(Clone, Debug)]
struct Canvas {
    roi: Rect,
    image: ImageF32,
    coverage: MaskU8,
}

impl Blender {
    /// Allocate the canvas for the union bounding box of all footprints.
    pub fn prepare(&mut self, corners: &[PointI], sizes: &[SizeI]) -> Result<()> {
        if corners.is_empty() || corners.len() != sizes.len() {
            return Err(StitchError::UnreadyState(
                "blender needs matching corner and size lists",
            ));
        }
        let mut roi = Rect::from_corner_size(corners[0], sizes[0]);
        for (corner, size) in corners.iter().zip(sizes).skip(1) {
            let r = Rect::from_corner_size(*corner, *size);
            let right = roi.right().max(r.right());
            let bottom = roi.bottom().max(r.bottom());
            roi.x = roi.x.min(r.x);
            roi.y = roi.y.min(r.y);
            roi.w = right - roi.x;
            roi.h = bottom - roi.y;
        }
        if roi.is_empty() {
            return Err(StitchError::GeometricDegeneracy(
                "blend region is empty".into(),
            ));
        }
        debug!("blend canvas {roi:?}");
        self.dst = Some(Canvas {
            roi,
            image: ImageF32::new(roi.w as usize, roi.h as usize),
            coverage: MaskU8::new(roi.w as usize, roi.h as usize),
        });
        Ok(())
    }

    /// Copy one image's mask-valid pixels onto the canvas.
    pub fn feed(&mut self, image: &ImageF32, mask: &MaskU8, corner: PointI) -> Result<()> {
        let canvas = self.dst.as_mut().ok_or(StitchError::UnreadyState(
            "blender has not been prepared",
        ))?;
        if (image.w, image.h) != (mask.w, mask.h) {
            return Err(StitchError::UnreadyState(
                "blend mask must match its image size",
            ));
        }
        let footprint = Rect::new(corner.x, corner.y, image.w as i32, image.h as i32);
        let clipped = footprint.intersect(&canvas.roi);
        for y in 0..clipped.h as usize {
            let sy = (clipped.y - corner.y) as usize + y;
            let dy = (clipped.y - canvas.roi.y) as usize + y;
            let sx0 = (clipped.x - corner.x) as usize;
            let dx0 = (clipped.x - canvas.roi.x) as usize;
            let src_row = &image.row(sy)[sx0..sx0 + clipped.w as usize];
            let mask_row = &mask.row(sy)[sx0..sx0 + clipped.w as usize];
            let dst_row = &mut canvas.image.row_mut(dy)[dx0..dx0 + clipped.w as usize];
            for ((dst, &src), &m) in dst_row.iter_mut().zip(src_row).zip(mask_row) {
                if m != 0 {
                    *dst = src;
                }
            }
            let cov_row = &mut canvas.coverage.row_mut(dy)[dx0..dx0 + clipped.w as usize];
            for (cov, &m) in cov_row.iter_mut().zip(mask_row) {
                if m != 0 {
                    *cov = 255;
                }
            }
        }
        Ok(())
    }

    /// Finish composition, returning the panorama and its coverage mask.
    pub fn blend(&mut self) -> Result<(ImageF32, MaskU8)> {
        let canvas = self.dst.take().ok_or(StitchError::UnreadyState(
            "blender has not been prepared",
        ))?;
        Ok((canvas.image, canvas.coverage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(w: usize, h: usize, value: f32) -> ImageF32 {
        let mut img = ImageF32::new(w, h);
        for v in img.data.iter_mut() {
            *v = value;
        }
        img
    }

    #[test]
    fn canvas_spans_union_of_footprints() {
        let mut blender = Blender::default();
        blender
            .prepare(
                &[PointI::new(-2, 0), PointI::new(4, 3)],
                &[SizeI::new(6, 5), SizeI::new(6, 5)],
            )
            .unwrap();
        let (pano, _) = blender.blend().unwrap();
        assert_eq!((pano.w, pano.h), (12, 8));
    }

    #[test]
    fn masked_pixels_land_at_their_corner() {
        let mut blender = Blender::default();
        blender
            .prepare(&[PointI::new(0, 0), PointI::new(4, 0)], &[
                SizeI::new(6, 4),
                SizeI::new(6, 4),
            ])
            .unwrap();

        let left = flat(6, 4, 0.25);
        let right = flat(6, 4, 0.75);
        let mut left_mask = MaskU8::filled(6, 4);
        let mut right_mask = MaskU8::filled(6, 4);
        // Seam at the middle of the overlap: left keeps global x < 5.
        for y in 0..4 {
            left_mask.set(5, y, false);
            right_mask.set(0, y, false);
        }
        blender.feed(&left, &left_mask, PointI::new(0, 0)).unwrap();
        blender
            .feed(&right, &right_mask, PointI::new(4, 0))
            .unwrap();

        let (pano, coverage) = blender.blend().unwrap();
        assert!((pano.get(4, 2) - 0.25).abs() < 1e-6);
        assert!((pano.get(5, 2) - 0.75).abs() < 1e-6);
        assert_eq!(coverage.count_valid(), 10 * 4);
    }

    #[test]
    fn feed_before_prepare_is_unready() {
        let mut blender = Blender::default();
        let img = flat(2, 2, 0.0);
        let mask = MaskU8::filled(2, 2);
        assert!(matches!(
            blender.feed(&img, &mask, PointI::new(0, 0)).unwrap_err(),
            StitchError::UnreadyState(_)
        ));
    }

    #[test]
    fn uncovered_pixels_stay_invalid() {
        let mut blender = Blender::default();
        blender
            .prepare(&[PointI::new(0, 0), PointI::new(8, 8)], &[
                SizeI::new(4, 4),
                SizeI::new(4, 4),
            ])
            .unwrap();
        blender
            .feed(&flat(4, 4, 1.0), &MaskU8::filled(4, 4), PointI::new(0, 0))
            .unwrap();
        let (_, coverage) = blender.blend().unwrap();
        assert!(coverage.get(0, 0));
        assert!(!coverage.get(6, 6));
    }
}
