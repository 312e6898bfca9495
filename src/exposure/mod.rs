//! Per-image gain compensation for exposure differences (stage 9).
//!
//! One multiplicative gain per image, estimated jointly from the mean
//! intensities of every pairwise overlap. The objective balances overlap
//! agreement (`g_i·m_ij ≈ g_j·m_ji`, weighted by overlap area) against a
//! prior holding gains near 1, and is linear in the gains, so a single
//! dense solve covers the whole set.

use crate::error::{Result, StitchError};
use crate::image::{ImageF32, MaskU8};
use crate::types::{PointI, Rect};
use log::debug;
use nalgebra::{DMatrix, DVector};

// Weights are inverse variances on unit-scale intensities: overlap error
// std ≈ 0.04, gain prior std ≈ 0.1.
const ALPHA: f64 = 1.0 / (0.04 * 0.04);
const BETA: f64 = 1.0 / (0.1 * 0.1);

/// Multiplicative gain compensator.
///
/// `feed` must run before `apply`; a compensator restored with
/// [`GainCompensator::from_gains`] is ready immediately.
#[derive(Clone, Debug, Default)]
pub struct GainCompensator {
    gains: Vec<f64>,
}

impl GainCompensator {
    /// Rebuild a compensator from previously estimated gains.
    pub fn from_gains(gains: Vec<f64>) -> Self {
        Self { gains }
    }

    /// Estimated gains, empty before `feed`.
    pub fn gains(&self) -> &[f64] {
        &self.gains
    }

    /// Estimate one gain per image from the warped stacks.
    pub fn feed(
        &mut self,
        corners: &[PointI],
        images: &[ImageF32],
        masks: &[MaskU8],
    ) -> Result<()> {
        let n = images.len();
        if n == 0 || corners.len() != n || masks.len() != n {
            return Err(StitchError::UnreadyState(
                "gain estimation requires equal-length image, corner and mask stacks",
            ));
        }

        let mut hessian = DMatrix::<f64>::zeros(n, n);
        let mut rhs = DVector::<f64>::zeros(n);
        let mut prior_weight = vec![0.0f64; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let Some((count, mean_i, mean_j)) =
                    overlap_means(corners, images, masks, i, j)
                else {
                    continue;
                };
                let w = ALPHA * count as f64;
                hessian[(i, i)] += w * mean_i * mean_i;
                hessian[(j, j)] += w * mean_j * mean_j;
                hessian[(i, j)] -= w * mean_i * mean_j;
                hessian[(j, i)] -= w * mean_i * mean_j;
                prior_weight[i] += count as f64;
                prior_weight[j] += count as f64;
            }
        }

        // Prior toward unit gain; images with no overlap stay at exactly 1.
        for i in 0..n {
            let w = BETA * prior_weight[i].max(1.0);
            hessian[(i, i)] += w;
            rhs[i] += w;
        }

        let solution = hessian.lu().solve(&rhs).ok_or_else(|| {
            StitchError::GeometricDegeneracy("gain normal equations are singular".into())
        })?;
        self.gains = solution.iter().copied().collect();
        debug!("estimated gains {:?}", self.gains);
        Ok(())
    }

    /// Scale one image by its gain, clamping back to `[0, 1]`.
    pub fn apply(&self, index: usize, image: &mut ImageF32) -> Result<()> {
        if self.gains.is_empty() {
            return Err(StitchError::UnreadyState(
                "gain compensator has not been fed",
            ));
        }
        let gain = *self.gains.get(index).ok_or_else(|| {
            StitchError::Config(format!(
                "image index {index} out of range for {} gains",
                self.gains.len()
            ))
        })? as f32;
        for v in image.data.iter_mut() {
            *v = (*v * gain).clamp(0.0, 1.0);
        }
        Ok(())
    }
}

/// Overlap pixel count and per-image mean intensity over pixels valid in
/// both masks; `None` when the pair shares no valid pixels.
fn overlap_means(
    corners: &[PointI],
    images: &[ImageF32],
    masks: &[MaskU8],
    i: usize,
    j: usize,
) -> Option<(usize, f64, f64)> {
    let rect_i = Rect::new(
        corners[i].x,
        corners[i].y,
        images[i].w as i32,
        images[i].h as i32,
    );
    let rect_j = Rect::new(
        corners[j].x,
        corners[j].y,
        images[j].w as i32,
        images[j].h as i32,
    );
    let overlap = rect_i.intersect(&rect_j);
    if overlap.is_empty() {
        return None;
    }

    let mut count = 0usize;
    let mut sum_i = 0.0f64;
    let mut sum_j = 0.0f64;
    for y in 0..overlap.h {
        for x in 0..overlap.w {
            let xi = (overlap.x - corners[i].x + x) as usize;
            let yi = (overlap.y - corners[i].y + y) as usize;
            let xj = (overlap.x - corners[j].x + x) as usize;
            let yj = (overlap.y - corners[j].y + y) as usize;
            if masks[i].get(xi, yi) && masks[j].get(xj, yj) {
                count += 1;
                sum_i += images[i].get(xi, yi) as f64;
                sum_j += images[j].get(xj, yj) as f64;
            }
        }
    }
    if count == 0 {
        return None;
    }
    Some((count, sum_i / count as f64, sum_j / count as f64))
}
