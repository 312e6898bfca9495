//! Camera model for the affine stitching pipeline (stage 5).
//!
//! A camera is the affine map taking one image's MEDIUM-tier pixel
//! coordinates into shared panorama coordinates. Cameras move through a
//! strict sequence: spanning-tree estimation, joint least-squares
//! adjustment, wave correction. The pipeline's staged context types enforce
//! that order; the functions here are pure input→output transforms.

mod adjust;
mod estimate;
mod wave;

pub use adjust::adjust;
pub use estimate::estimate;
pub use wave::{wave_correct, WaveCorrectKind};

use nalgebra::{Matrix2, Matrix3};

/// Per-image affine camera (last row fixed at `0 0 1`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraParams {
    pub transform: Matrix3<f64>,
}

impl CameraParams {
    pub fn identity() -> Self {
        Self {
            transform: Matrix3::identity(),
        }
    }

    /// Linear (non-translation) part of the camera.
    pub fn linear(&self) -> Matrix2<f64> {
        Matrix2::new(
            self.transform[(0, 0)],
            self.transform[(0, 1)],
            self.transform[(1, 0)],
            self.transform[(1, 1)],
        )
    }

    /// Intrinsic scale factor of the affine model, `sqrt(|det L|)`.
    pub fn scale(&self) -> f64 {
        self.linear().determinant().abs().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_of_identity_is_one() {
        assert!((CameraParams::identity().scale() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scale_tracks_uniform_zoom() {
        let mut camera = CameraParams::identity();
        camera.transform[(0, 0)] = 2.0;
        camera.transform[(1, 1)] = 2.0;
        assert!((camera.scale() - 2.0).abs() < 1e-12);
    }
}
