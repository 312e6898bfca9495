//! Serializable run report: stage timings, match diagnostics and the
//! recovered geometry summary.

use crate::types::{Rect, SizeI};
use nalgebra::Matrix3;
use serde::Serialize;
use std::time::Instant;

/// Wall-clock milliseconds spent in each pipeline stage.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StageTimings {
    pub find_features_ms: f64,
    pub match_ms: f64,
    pub subset_ms: f64,
    pub estimate_ms: f64,
    pub adjust_ms: f64,
    pub warp_ms: f64,
    pub crop_ms: f64,
    pub seam_ms: f64,
    pub exposure_ms: f64,
    pub blend_ms: f64,
    pub total_ms: f64,
}

/// Diagnostics emitted alongside the panorama.
#[derive(Clone, Debug, Serialize)]
pub struct StitchReport {
    pub num_input_images: usize,
    /// Original indices of the images retained by the subset stage.
    pub kept_indices: Vec<usize>,
    pub confidence_threshold: f64,
    /// Symmetric pairwise confidence matrix over the input set, before
    /// subsetting.
    pub confidence_matrix: Vec<Vec<f64>>,
    /// Match graph in Graphviz dot syntax.
    pub match_graph: String,
    /// Adjusted camera transforms of the kept images, medium-tier pixels to
    /// panorama coordinates.
    pub cameras: Vec<Matrix3<f64>>,
    /// Crop window in low-tier panorama coordinates; `None` when cropping
    /// is disabled.
    pub crop_rect: Option<Rect>,
    pub panorama_size: SizeI,
    pub timings: StageTimings,
}

/// Milliseconds elapsed since `start`.
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;

    #[test]
    fn report_serializes_to_json() {
        let report = StitchReport {
            num_input_images: 3,
            kept_indices: vec![0, 1, 2],
            confidence_threshold: 1.0,
            confidence_matrix: vec![vec![0.0; 3]; 3],
            match_graph: "graph matches {}".into(),
            cameras: vec![Matrix3::identity(); 3],
            crop_rect: Some(Rect::new(0, 0, 10, 10)),
            panorama_size: SizeI::new(10, 10),
            timings: StageTimings::default(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"kept_indices\":[0,1,2]"));
        assert!(json.contains("\"total_ms\":0.0"));
    }
}
