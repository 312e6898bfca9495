//! Projection of images and masks into panorama coordinates (stage 6).
//!
//! The warper applies each image's affine camera, rescaled for the tier
//! being warped, and produces the warped canvas together with its corner
//! offset in panorama space. Cameras are estimated on the MEDIUM tier, so
//! warping tier T uses `aspect = ratio(MEDIUM → T)`: the linear part is
//! resolution-invariant and only the translation scales. LOW and FINAL
//! warps therefore share the same cameras while their corner/size arrays
//! are computed independently per tier.

use crate::camera::CameraParams;
use crate::error::{Result, StitchError};
use crate::image::{ImageF32, MaskU8};
use crate::types::{PointI, SizeI};
use nalgebra::Matrix3;

const EPS: f64 = 1e-9;

/// Affine warper with a frozen reference scale.
#[derive(Clone, Copy, Debug)]
pub struct AffineWarper {
    scale: f64,
}

impl Default for AffineWarper {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl AffineWarper {
    /// Warper with a previously frozen scale (incremental re-blend path).
    pub fn with_scale(scale: f64) -> Self {
        Self { scale }
    }

    /// Fix the global panorama scale from the camera intrinsics: the
    /// reciprocal of the median per-camera scale, so the mean zoom of the
    /// panorama is 1 regardless of tier.
    pub fn set_scale(&mut self, cameras: &[CameraParams]) {
        let mut scales: Vec<f64> = cameras.iter().map(|c| c.scale()).collect();
        scales.retain(|s| *s > EPS);
        if scales.is_empty() {
            self.scale = 1.0;
            return;
        }
        scales.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = scales[scales.len() / 2];
        self.scale = 1.0 / median;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Full tier-space warp matrix for one camera.
    fn warp_matrix(&self, camera: &CameraParams, aspect: f32) -> Matrix3<f64> {
        let a = aspect as f64;
        let mut m = camera.transform;
        for row in 0..2 {
            for col in 0..2 {
                m[(row, col)] *= self.scale;
            }
            m[(row, 2)] *= self.scale * a;
        }
        m
    }

    /// Corner offset and extent of a `size` image warped by `camera`.
    pub fn warp_roi(
        &self,
        size: SizeI,
        camera: &CameraParams,
        aspect: f32,
    ) -> Result<(PointI, SizeI)> {
        if size.is_empty() {
            return Err(StitchError::GeometricDegeneracy(
                "cannot warp an empty image".into(),
            ));
        }
        let m = self.warp_matrix(camera, aspect);
        if (m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]).abs() < EPS {
            return Err(StitchError::GeometricDegeneracy(
                "camera transform is singular".into(),
            ));
        }
        let w = size.w as f64;
        let h = size.h as f64;
        let corners = [[0.0, 0.0], [w, 0.0], [0.0, h], [w, h]];
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for c in corners {
            let x = m[(0, 0)] * c[0] + m[(0, 1)] * c[1] + m[(0, 2)];
            let y = m[(1, 0)] * c[0] + m[(1, 1)] * c[1] + m[(1, 2)];
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let corner = PointI::new(min_x.floor() as i32, min_y.floor() as i32);
        let extent = SizeI::new(
            (max_x.ceil() as i32 - corner.x).max(1),
            (max_y.ceil() as i32 - corner.y).max(1),
        );
        Ok((corner, extent))
    }

    /// Warp one image into panorama space by inverse mapping with bilinear
    /// sampling; pixels with no source stay 0 (the companion mask marks
    /// them invalid).
    pub fn warp_image(
        &self,
        image: &ImageF32,
        camera: &CameraParams,
        aspect: f32,
    ) -> Result<(ImageF32, PointI)> {
        let size = SizeI::new(image.w as i32, image.h as i32);
        let (corner, extent) = self.warp_roi(size, camera, aspect)?;
        let m = self.warp_matrix(camera, aspect);
        let inv = m.try_inverse().ok_or_else(|| {
            StitchError::GeometricDegeneracy("camera transform is not invertible".into())
        })?;

        let mut out = ImageF32::new(extent.w as usize, extent.h as usize);
        for y in 0..out.h {
            let dst_y = (corner.y + y as i32) as f64 + 0.5;
            let row = out.row_mut(y);
            for (x, dst_px) in row.iter_mut().enumerate() {
                let dst_x = (corner.x + x as i32) as f64 + 0.5;
                let sx = inv[(0, 0)] * dst_x + inv[(0, 1)] * dst_y + inv[(0, 2)] - 0.5;
                let sy = inv[(1, 0)] * dst_x + inv[(1, 1)] * dst_y + inv[(1, 2)] - 0.5;
                if let Some(v) = image.sample_bilinear(sx as f32, sy as f32) {
                    *dst_px = v;
                }
            }
        }
        Ok((out, corner))
    }

    /// Warp the all-valid mask of an image of `size`, marking which warped
    /// pixels have real source content.
    pub fn warp_mask(
        &self,
        size: SizeI,
        camera: &CameraParams,
        aspect: f32,
    ) -> Result<(MaskU8, PointI)> {
        let (corner, extent) = self.warp_roi(size, camera, aspect)?;
        let m = self.warp_matrix(camera, aspect);
        let inv = m.try_inverse().ok_or_else(|| {
            StitchError::GeometricDegeneracy("camera transform is not invertible".into())
        })?;

        let max_x = (size.w - 1) as f64;
        let max_y = (size.h - 1) as f64;
        let mut mask = MaskU8::new(extent.w as usize, extent.h as usize);
        for y in 0..mask.h {
            let dst_y = (corner.y + y as i32) as f64 + 0.5;
            let row = mask.row_mut(y);
            for (x, dst_px) in row.iter_mut().enumerate() {
                let dst_x = (corner.x + x as i32) as f64 + 0.5;
                let sx = inv[(0, 0)] * dst_x + inv[(0, 1)] * dst_y + inv[(0, 2)] - 0.5;
                let sy = inv[(1, 0)] * dst_x + inv[(1, 1)] * dst_y + inv[(1, 2)] - 0.5;
                if sx >= 0.0 && sy >= 0.0 && sx <= max_x && sy <= max_y {
                    *dst_px = 255;
                }
            }
        }
        Ok((mask, corner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translated_camera(dx: f64, dy: f64) -> CameraParams {
        let mut camera = CameraParams::identity();
        camera.transform[(0, 2)] = dx;
        camera.transform[(1, 2)] = dy;
        camera
    }

    #[test]
    fn identity_camera_keeps_image_in_place() {
        let warper = AffineWarper::default();
        let mut img = ImageF32::new(8, 6);
        img.set(3, 2, 0.7);
        let (warped, corner) = warper
            .warp_image(&img, &CameraParams::identity(), 1.0)
            .unwrap();
        assert_eq!(corner, PointI::new(0, 0));
        assert_eq!((warped.w, warped.h), (8, 6));
        assert!((warped.get(3, 2) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn translation_moves_corner_not_pixels() {
        let warper = AffineWarper::default();
        let camera = translated_camera(10.0, -4.0);
        let (corner, size) = warper.warp_roi(SizeI::new(8, 6), &camera, 1.0).unwrap();
        assert_eq!(corner, PointI::new(10, -4));
        assert_eq!(size, SizeI::new(8, 6));
    }

    #[test]
    fn aspect_scales_translation_only() {
        let warper = AffineWarper::default();
        let camera = translated_camera(10.0, 6.0);
        let (corner, size) = warper.warp_roi(SizeI::new(16, 12), &camera, 2.0).unwrap();
        assert_eq!(corner, PointI::new(20, 12));
        assert_eq!(size, SizeI::new(16, 12));
    }

    #[test]
    fn mask_matches_footprint() {
        let warper = AffineWarper::default();
        let camera = translated_camera(3.0, 3.0);
        let (mask, _) = warper.warp_mask(SizeI::new(8, 6), &camera, 1.0).unwrap();
        assert_eq!((mask.w, mask.h), (8, 6));
        assert_eq!(mask.count_valid(), 8 * 6);
    }

    #[test]
    fn singular_camera_is_degenerate() {
        let warper = AffineWarper::default();
        let mut camera = CameraParams::identity();
        camera.transform[(0, 0)] = 0.0;
        camera.transform[(1, 1)] = 0.0;
        let err = warper.warp_roi(SizeI::new(8, 6), &camera, 1.0).unwrap_err();
        assert!(matches!(err, StitchError::GeometricDegeneracy(_)));
    }

    #[test]
    fn set_scale_normalizes_median_zoom() {
        let mut warper = AffineWarper::default();
        let mut zoomed = CameraParams::identity();
        zoomed.transform[(0, 0)] = 2.0;
        zoomed.transform[(1, 1)] = 2.0;
        warper.set_scale(&[zoomed]);
        assert!((warper.scale() - 0.5).abs() < 1e-12);
    }
}
