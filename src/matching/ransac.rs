//! Robust affine fitting over putative correspondences.
//!
//! Standard RANSAC loop with a 3-point minimal solver and a least-squares
//! refit over the consensus set. The RNG is seeded by the caller (one fixed
//! seed per image pair), keeping the whole pipeline deterministic.

use super::affine::{self, PointPair};
use nalgebra::Matrix3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Copy, Debug)]
pub struct RansacParams {
    pub max_iterations: usize,
    /// Inlier gate on the reprojection error, in pixels.
    pub inlier_threshold: f64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            inlier_threshold: 3.0,
        }
    }
}

/// Robust fit result: refined transform plus the consensus set.
#[derive(Clone, Debug)]
pub struct RansacFit {
    pub transform: Matrix3<f64>,
    pub inliers: Vec<PointPair>,
}

/// Estimate an affine map from `pairs`, rejecting outliers.
///
/// Returns `None` when fewer than 3 correspondences exist or no hypothesis
/// gathers at least 3 inliers.
pub fn estimate_affine(pairs: &[PointPair], params: &RansacParams, seed: u64) -> Option<RansacFit> {
    if pairs.len() < 3 {
        return None;
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    let threshold_sq = params.inlier_threshold * params.inlier_threshold;
    let mut best_count = 0usize;
    let mut best_model: Option<Matrix3<f64>> = None;

    for _ in 0..params.max_iterations {
        let sample = sample_triplet(pairs.len(), &mut rng);
        let Some(model) = affine::solve_exact(&[pairs[sample[0]], pairs[sample[1]], pairs[sample[2]]])
        else {
            continue;
        };
        let count = pairs
            .iter()
            .filter(|p| affine::transfer_error_sq(&model, p) <= threshold_sq)
            .count();
        if count > best_count {
            best_count = count;
            best_model = Some(model);
            // All correspondences agree; no better hypothesis exists.
            if count == pairs.len() {
                break;
            }
        }
    }

    let model = best_model?;
    if best_count < 3 {
        return None;
    }

    let consensus: Vec<PointPair> = pairs
        .iter()
        .filter(|p| affine::transfer_error_sq(&model, p) <= threshold_sq)
        .copied()
        .collect();
    let refined = affine::fit_least_squares(&consensus).unwrap_or(model);
    let inliers: Vec<PointPair> = pairs
        .iter()
        .filter(|p| affine::transfer_error_sq(&refined, p) <= threshold_sq)
        .copied()
        .collect();
    if inliers.len() < 3 {
        return None;
    }
    Some(RansacFit {
        transform: refined,
        inliers,
    })
}

fn sample_triplet(n: usize, rng: &mut SmallRng) -> [usize; 3] {
    let a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n);
    while b == a {
        b = rng.gen_range(0..n);
    }
    let mut c = rng.gen_range(0..n);
    while c == a || c == b {
        c = rng.gen_range(0..n);
    }
    [a, b, c]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_translation_with_outliers() {
        let mut pairs: Vec<PointPair> = (0..20)
            .map(|i| {
                let x = (i % 5) as f64 * 10.0;
                let y = (i / 5) as f64 * 10.0;
                ([x, y], [x + 30.0, y - 12.0])
            })
            .collect();
        // Gross outliers that should be rejected.
        pairs.push(([0.0, 0.0], [500.0, 500.0]));
        pairs.push(([10.0, 10.0], [-400.0, 300.0]));

        let fit = estimate_affine(&pairs, &RansacParams::default(), 7).unwrap();
        assert_eq!(fit.inliers.len(), 20);
        assert!((fit.transform[(0, 2)] - 30.0).abs() < 1e-6);
        assert!((fit.transform[(1, 2)] + 12.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_pairs_yield_none() {
        let pairs = vec![([0.0, 0.0], [1.0, 1.0]); 2];
        assert!(estimate_affine(&pairs, &RansacParams::default(), 1).is_none());
    }

    #[test]
    fn same_seed_same_fit() {
        let pairs: Vec<PointPair> = (0..12)
            .map(|i| {
                let x = (i % 4) as f64 * 7.0;
                let y = (i / 4) as f64 * 7.0;
                ([x, y], [x + 2.0, y + 3.0])
            })
            .collect();
        let a = estimate_affine(&pairs, &RansacParams::default(), 42).unwrap();
        let b = estimate_affine(&pairs, &RansacParams::default(), 42).unwrap();
        assert_eq!(a.transform, b.transform);
    }
}
