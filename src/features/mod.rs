//! Keypoint/descriptor extraction on the MEDIUM tier.
//!
//! A FAST-style corner test finds candidate keypoints, grid non-maximum
//! suppression thins them, and a fixed binary sampling pattern produces
//! 256-bit descriptors. Detection is a pure function of the pixels: the
//! descriptor pattern is generated once from a fixed seed, so identical
//! input always yields identical features.

mod brief;
mod fast;

pub use brief::{hamming, DESCRIPTOR_BYTES};

use crate::image::ImageF32;
use rayon::prelude::*;

/// Keypoint location in MEDIUM-tier pixel coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Corner strength used for ranking and suppression.
    pub response: f32,
}

/// One keypoint with its 256-bit binary descriptor.
#[derive(Clone, Debug)]
pub struct Feature {
    pub keypoint: Keypoint,
    pub descriptor: [u8; DESCRIPTOR_BYTES],
}

/// Unordered feature collection for a single image. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Detector configuration.
#[derive(Clone, Copy, Debug)]
pub struct DetectorParams {
    /// Intensity contrast (in [0,1] units) a ring pixel needs to count as
    /// brighter/darker than the centre.
    pub corner_threshold: f32,
    /// Upper bound on the number of features kept per image.
    pub max_features: usize,
    /// Cell size of the grid non-maximum suppression, in pixels.
    pub nms_radius: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            corner_threshold: 0.06,
            max_features: 500,
            nms_radius: 5.0,
        }
    }
}

/// Extract features from one image. Images too small for the descriptor
/// window yield an empty set rather than an error.
pub fn detect(image: &ImageF32, params: &DetectorParams) -> FeatureSet {
    let border = brief::PATTERN_RADIUS.max(fast::RING_RADIUS) as usize;
    if image.w <= 2 * border || image.h <= 2 * border {
        return FeatureSet::default();
    }

    let corners = fast::detect_corners(image, params.corner_threshold);
    let kept = fast::suppress_grid(corners, params.nms_radius, params.max_features);

    let features = kept
        .into_iter()
        .map(|keypoint| Feature {
            descriptor: brief::describe(image, &keypoint),
            keypoint,
        })
        .collect();
    FeatureSet { features }
}

/// Detect features for every image of the set, index-aligned with the input.
pub fn detect_all(images: &[&ImageF32], params: &DetectorParams) -> Vec<FeatureSet> {
    images.par_iter().map(|img| detect(img, params)).collect()
}
