//! Fixed resolution ladder used throughout the pipeline.

use serde::Serialize;

/// The three tiers every frame is held at.
///
/// MEDIUM drives feature detection and camera estimation, LOW drives the
/// cheap geometric estimates (crop, seams, exposure), FINAL is composited
/// into the output. The discriminants index [`TierSettings::tier_scales`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ResolutionTier {
    Low = 0,
    Medium = 1,
    Final = 2,
}

/// Megapixel targets controlling how each tier is derived from the input.
#[derive(Clone, Copy, Debug)]
pub struct TierSettings {
    /// Target size of the LOW tier in megapixels.
    pub low_megapix: f32,
    /// Target size of the MEDIUM tier in megapixels.
    pub medium_megapix: f32,
    /// Target size of the FINAL tier; `None` keeps full input resolution.
    pub final_megapix: Option<f32>,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            low_megapix: 0.1,
            medium_megapix: 0.6,
            final_megapix: None,
        }
    }
}

impl TierSettings {
    /// Uniform downscale factors `[low, medium, final]` for an input of
    /// `w × h` pixels. Tiers never upscale: factors are clamped to 1.
    pub fn tier_scales(&self, w: usize, h: usize) -> [f32; 3] {
        let pixels = (w * h) as f32;
        let scale_for = |megapix: f32| -> f32 {
            let target = megapix * 1e6;
            if target <= 0.0 || pixels <= target {
                1.0
            } else {
                (target / pixels).sqrt()
            }
        };
        [
            scale_for(self.low_megapix),
            scale_for(self.medium_megapix),
            self.final_megapix.map_or(1.0, scale_for),
        ]
    }
}
