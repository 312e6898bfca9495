//! Joint least-squares refinement of all cameras (bundle adjustment for
//! the affine-only model).
//!
//! Every inlier correspondence of every retained pair contributes the
//! residual `A_i p − A_j q` in panorama coordinates. The model is linear in
//! the six affine parameters per camera, so one normal-equation solve
//! refines all cameras simultaneously. The reference (best-connected root
//! would do, but any fixed gauge works) is the first camera, held at its
//! estimated value; a light Tikhonov pull toward the initial estimates
//! keeps the system well-posed when pairs are sparse.

use super::CameraParams;
use crate::error::{Result, StitchError};
use crate::matching::MatchSet;
use log::debug;
use nalgebra::{DMatrix, DVector, Matrix3};

const PARAMS_PER_CAMERA: usize = 6;
const DAMPING: f64 = 1e-6;

/// Refine estimated cameras against all inlier correspondences.
///
/// The first camera is the gauge and comes back unchanged. Returns
/// `GeometricDegeneracy` when the normal equations cannot be solved.
pub fn adjust(matches: &MatchSet, cameras: &[CameraParams]) -> Result<Vec<CameraParams>> {
    let n = cameras.len();
    if n != matches.num_images() {
        return Err(StitchError::UnreadyState(
            "camera count does not match the match set",
        ));
    }
    if n < 2 {
        return Err(StitchError::InsufficientOverlap(
            "adjustment requires at least 2 cameras".into(),
        ));
    }

    // Unknowns: cameras 1..n (camera 0 is the gauge).
    let dof = (n - 1) * PARAMS_PER_CAMERA;
    let mut hessian = DMatrix::<f64>::zeros(dof, dof);
    let mut gradient = DVector::<f64>::zeros(dof);
    let mut residual_count = 0usize;

    for pair in matches.pairs() {
        for &(p, q) in &pair.inliers {
            // Two scalar residuals (x and y row) per correspondence:
            //   row_i(k) · p − row_j(k) · q = 0,  k ∈ {x, y}
            for row in 0..2 {
                let mut coeffs: Vec<(usize, f64)> = Vec::with_capacity(6);
                let mut rhs = 0.0f64;
                accumulate_block(pair.i, row, &p, 1.0, cameras, &mut coeffs, &mut rhs);
                accumulate_block(pair.j, row, &q, -1.0, cameras, &mut coeffs, &mut rhs);
                for &(col_a, val_a) in &coeffs {
                    gradient[col_a] += val_a * rhs;
                    for &(col_b, val_b) in &coeffs {
                        hessian[(col_a, col_b)] += val_a * val_b;
                    }
                }
            }
            residual_count += 2;
        }
    }

    if residual_count == 0 {
        return Err(StitchError::InsufficientOverlap(
            "no inlier correspondences available for adjustment".into(),
        ));
    }

    // Damp toward the initial estimates.
    let initial = pack(cameras);
    for d in 0..dof {
        hessian[(d, d)] += DAMPING;
        gradient[d] += DAMPING * initial[d];
    }

    let solution = hessian.lu().solve(&gradient).ok_or_else(|| {
        StitchError::GeometricDegeneracy("camera adjustment normal equations are singular".into())
    })?;

    let adjusted = unpack(&solution, cameras);
    debug!(
        "adjusted {} cameras over {} residuals",
        adjusted.len(),
        residual_count
    );
    Ok(adjusted)
}

/// Add one camera's contribution to a residual row. Gauge camera terms are
/// constants and move to the right-hand side.
fn accumulate_block(
    image: usize,
    row: usize,
    point: &[f64; 2],
    sign: f64,
    cameras: &[CameraParams],
    coeffs: &mut Vec<(usize, f64)>,
    rhs: &mut f64,
) {
    let monomials = [point[0], point[1], 1.0];
    if image == 0 {
        let cam_row = cameras[0].transform.row(row);
        let value: f64 = (0..3).map(|k| cam_row[k] * monomials[k]).sum();
        *rhs -= sign * value;
    } else {
        let base = (image - 1) * PARAMS_PER_CAMERA + row * 3;
        for (k, &m) in monomials.iter().enumerate() {
            coeffs.push((base + k, sign * m));
        }
    }
}

fn pack(cameras: &[CameraParams]) -> DVector<f64> {
    let dof = (cameras.len() - 1) * PARAMS_PER_CAMERA;
    let mut x = DVector::zeros(dof);
    for (idx, camera) in cameras.iter().enumerate().skip(1) {
        let base = (idx - 1) * PARAMS_PER_CAMERA;
        for row in 0..2 {
            for col in 0..3 {
                x[base + row * 3 + col] = camera.transform[(row, col)];
            }
        }
    }
    x
}

fn unpack(x: &DVector<f64>, cameras: &[CameraParams]) -> Vec<CameraParams> {
    let mut out = Vec::with_capacity(cameras.len());
    out.push(cameras[0]);
    for idx in 1..cameras.len() {
        let base = (idx - 1) * PARAMS_PER_CAMERA;
        let mut transform = Matrix3::identity();
        for row in 0..2 {
            for col in 0..3 {
                transform[(row, col)] = x[base + row * 3 + col];
            }
        }
        out.push(CameraParams { transform });
    }
    out
}
