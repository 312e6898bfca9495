//! Global tilt ("wave") correction after joint adjustment.
//!
//! Chained estimation can leave a common rotation drift across the set.
//! Correction measures the mean rotation of all cameras via polar
//! decomposition of the average linear part and applies its inverse as a
//! global panorama-space rotation. The affine configuration defaults to
//! `No`, which is a strict passthrough.

use super::CameraParams;
use nalgebra::{Matrix2, Matrix3};
use serde::Serialize;

/// Wave-correction variants recognized by the pipeline configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum WaveCorrectKind {
    /// Leave cameras untouched (default for the affine model).
    #[default]
    No,
    /// Level the panorama so the mean camera x-axis is horizontal.
    Horizontal,
    /// Level the panorama so the mean camera y-axis is vertical.
    Vertical,
}

/// Apply wave correction of the requested kind.
pub fn wave_correct(cameras: &[CameraParams], kind: WaveCorrectKind) -> Vec<CameraParams> {
    if kind == WaveCorrectKind::No || cameras.is_empty() {
        return cameras.to_vec();
    }

    let mut mean = Matrix2::zeros();
    for camera in cameras {
        mean += camera.linear();
    }
    mean /= cameras.len() as f64;

    let angle = mean_rotation_angle(&mean, kind);
    let (sin, cos) = angle.sin_cos();
    // Inverse rotation applied on the panorama side of every camera.
    let correction = Matrix3::new(cos, sin, 0.0, -sin, cos, 0.0, 0.0, 0.0, 1.0);
    cameras
        .iter()
        .map(|camera| CameraParams {
            transform: correction * camera.transform,
        })
        .collect()
}

/// Rotation component of the mean linear part, measured against the axis
/// the correction levels.
fn mean_rotation_angle(mean: &Matrix2<f64>, kind: WaveCorrectKind) -> f64 {
    match kind {
        WaveCorrectKind::No => 0.0,
        // Angle of the transformed x-axis against horizontal.
        WaveCorrectKind::Horizontal => mean[(1, 0)].atan2(mean[(0, 0)]),
        // Angle of the transformed y-axis against vertical.
        WaveCorrectKind::Vertical => (-mean[(0, 1)]).atan2(mean[(1, 1)]),
    }
}
