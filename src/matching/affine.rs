//! Closed-form 2-D affine estimation from point correspondences.
//!
//! An affine map is the 3×3 matrix `[a b tx; c d ty; 0 0 1]` acting on
//! homogeneous pixel coordinates. The exact 3-point solve feeds RANSAC
//! hypotheses; the least-squares fit refines over all inliers.

use nalgebra::{Matrix3, Vector3};

const EPS: f64 = 1e-12;

/// A source→destination point correspondence.
pub type PointPair = ([f64; 2], [f64; 2]);

/// Apply an affine matrix to a point.
#[inline]
pub fn apply(m: &Matrix3<f64>, p: [f64; 2]) -> [f64; 2] {
    [
        m[(0, 0)] * p[0] + m[(0, 1)] * p[1] + m[(0, 2)],
        m[(1, 0)] * p[0] + m[(1, 1)] * p[1] + m[(1, 2)],
    ]
}

/// Squared reprojection error of one correspondence under `m`.
#[inline]
pub fn transfer_error_sq(m: &Matrix3<f64>, pair: &PointPair) -> f64 {
    let q = apply(m, pair.0);
    let dx = q[0] - pair.1[0];
    let dy = q[1] - pair.1[1];
    dx * dx + dy * dy
}

/// Exact affine from three correspondences; `None` when the source points
/// are (near-)collinear.
pub fn solve_exact(pairs: &[PointPair; 3]) -> Option<Matrix3<f64>> {
    let a = Matrix3::new(
        pairs[0].0[0],
        pairs[0].0[1],
        1.0,
        pairs[1].0[0],
        pairs[1].0[1],
        1.0,
        pairs[2].0[0],
        pairs[2].0[1],
        1.0,
    );
    if a.determinant().abs() < EPS {
        return None;
    }
    let inv = a.try_inverse()?;
    let bx = Vector3::new(pairs[0].1[0], pairs[1].1[0], pairs[2].1[0]);
    let by = Vector3::new(pairs[0].1[1], pairs[1].1[1], pairs[2].1[1]);
    let row_x = inv * bx;
    let row_y = inv * by;
    Some(Matrix3::new(
        row_x[0], row_x[1], row_x[2], row_y[0], row_y[1], row_y[2], 0.0, 0.0, 1.0,
    ))
}

/// Least-squares affine over all correspondences via normal equations.
///
/// Both output rows share the same 3×3 Gram matrix of `[x y 1]` monomials,
/// so it is inverted once and applied to the two right-hand sides.
pub fn fit_least_squares(pairs: &[PointPair]) -> Option<Matrix3<f64>> {
    if pairs.len() < 3 {
        return None;
    }
    let mut gram = Matrix3::zeros();
    let mut rhs_x = Vector3::zeros();
    let mut rhs_y = Vector3::zeros();
    for (src, dst) in pairs {
        let row = Vector3::new(src[0], src[1], 1.0);
        gram += row * row.transpose();
        rhs_x += row * dst[0];
        rhs_y += row * dst[1];
    }
    if gram.determinant().abs() < EPS {
        return None;
    }
    let inv = gram.try_inverse()?;
    let row_x = inv * rhs_x;
    let row_y = inv * rhs_y;
    Some(Matrix3::new(
        row_x[0], row_x[1], row_x[2], row_y[0], row_y[1], row_y[2], 0.0, 0.0, 1.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(pairs: &[( f64, f64)], dx: f64, dy: f64) -> Vec<PointPair> {
        pairs
            .iter()
            .map(|&(x, y)| ([x, y], [x + dx, y + dy]))
            .collect()
    }

    #[test]
    fn exact_solve_recovers_translation() {
        let pairs = translate(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)], 5.0, -3.0);
        let m = solve_exact(&[pairs[0], pairs[1], pairs[2]]).unwrap();
        assert!((m[(0, 2)] - 5.0).abs() < 1e-9);
        assert!((m[(1, 2)] + 3.0).abs() < 1e-9);
        assert!((m[(0, 0)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exact_solve_rejects_collinear_points() {
        let pairs = translate(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)], 1.0, 1.0);
        assert!(solve_exact(&[pairs[0], pairs[1], pairs[2]]).is_none());
    }

    #[test]
    fn least_squares_matches_exact_on_clean_data() {
        let pairs = translate(
            &[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0), (5.0, 7.0)],
            2.5,
            4.0,
        );
        let m = fit_least_squares(&pairs).unwrap();
        for pair in &pairs {
            assert!(transfer_error_sq(&m, pair) < 1e-12);
        }
    }
}
