//! Pipeline configuration, validated before any pixel work.

use crate::camera::WaveCorrectKind;
use crate::error::{Result, StitchError};
use crate::features::DetectorParams;
use crate::frames::TierSettings;
use crate::matching::MatcherParams;
use crate::seam::SeamParams;

/// Feature detector variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectorKind {
    /// FAST corners with binary descriptors.
    #[default]
    FastBrief,
}

/// Camera estimator variants (2-D affine motion model only).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EstimatorKind {
    #[default]
    Affine,
}

/// Camera adjuster variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdjusterKind {
    /// Joint affine least squares over all inlier correspondences.
    #[default]
    Affine,
    /// Keep the chained spanning-tree estimates as-is.
    No,
}

/// Warper variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WarperKind {
    #[default]
    Affine,
}

/// Full pipeline configuration.
#[derive(Clone, Copy, Debug)]
pub struct StitcherParams {
    pub tiers: TierSettings,
    pub detector: DetectorKind,
    pub detector_params: DetectorParams,
    pub matcher: MatcherParams,
    /// Pairs below this confidence do not count as overlapping.
    pub confidence_threshold: f64,
    pub estimator: EstimatorKind,
    pub adjuster: AdjusterKind,
    pub wave_correct: WaveCorrectKind,
    pub warper: WarperKind,
    pub seam: SeamParams,
    /// Estimate and apply per-image gains before blending.
    pub compensate_exposure: bool,
    /// Crop the panorama to its largest interior rectangle.
    pub crop: bool,
}

impl Default for StitcherParams {
    fn default() -> Self {
        Self {
            tiers: TierSettings::default(),
            detector: DetectorKind::default(),
            detector_params: DetectorParams::default(),
            matcher: MatcherParams::default(),
            confidence_threshold: 1.0,
            estimator: EstimatorKind::default(),
            adjuster: AdjusterKind::default(),
            wave_correct: WaveCorrectKind::default(),
            warper: WarperKind::default(),
            seam: SeamParams::default(),
            compensate_exposure: true,
            crop: true,
        }
    }
}

impl StitcherParams {
    /// Reject configurations the pipeline cannot run.
    pub fn validate(&self) -> Result<()> {
        if !self.confidence_threshold.is_finite() || self.confidence_threshold <= 0.0 {
            return Err(StitchError::Config(format!(
                "confidence threshold must be positive, got {}",
                self.confidence_threshold
            )));
        }
        if self.tiers.low_megapix <= 0.0 || self.tiers.medium_megapix <= 0.0 {
            return Err(StitchError::Config(
                "tier megapixel targets must be positive".into(),
            ));
        }
        if let Some(final_megapix) = self.tiers.final_megapix {
            if final_megapix <= 0.0 {
                return Err(StitchError::Config(
                    "final tier megapixel target must be positive".into(),
                ));
            }
        }
        if self.detector_params.max_features == 0 {
            return Err(StitchError::Config(
                "detector must keep at least one feature".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.matcher.ratio) || self.matcher.ratio == 0.0 {
            return Err(StitchError::Config(format!(
                "matcher ratio must lie in (0, 1], got {}",
                self.matcher.ratio
            )));
        }
        if self.matcher.min_inliers < 3 {
            return Err(StitchError::Config(
                "an affine fit needs at least 3 inliers".into(),
            ));
        }
        if self.matcher.ransac.max_iterations == 0 {
            return Err(StitchError::Config(
                "RANSAC needs at least one iteration".into(),
            ));
        }
        if self.matcher.ransac.inlier_threshold <= 0.0 {
            return Err(StitchError::Config(
                "RANSAC inlier threshold must be positive".into(),
            ));
        }
        if self.seam.grad_weight < 0.0 {
            return Err(StitchError::Config(
                "seam gradient weight must be non-negative".into(),
            ));
        }
        Ok(())
    }
}
