//! Pipeline orchestration: one entry point running stages 2→10 over a
//! frame set, plus the incremental re-blend path reusing frozen geometry.

mod params;
mod pipeline;

pub use params::{AdjusterKind, DetectorKind, EstimatorKind, StitcherParams, WarperKind};

use crate::camera::CameraParams;
use crate::diagnostics::{elapsed_ms, StageTimings, StitchReport};
use crate::error::Result;
use crate::frames::FrameSet;
use crate::image::{ImageF32, MaskU8};
use crate::types::{PointI, Rect, SizeI};
use log::debug;
use std::time::Instant;

/// Blended output image with its coverage mask.
#[derive(Clone, Debug)]
pub struct Panorama {
    pub image: ImageF32,
    /// Valid where at least one source image contributed a pixel.
    pub mask: MaskU8,
}

impl Panorama {
    pub fn size(&self) -> SizeI {
        SizeI::new(self.image.w as i32, self.image.h as i32)
    }
}

/// Everything needed to re-blend a new index-aligned image set without
/// re-running detection, matching or camera estimation.
#[derive(Clone, Debug)]
pub struct StitchGeometry {
    /// Number of frames the geometry was frozen for (post-subset).
    pub num_frames: usize,
    /// Adjusted cameras, MEDIUM-tier pixels to panorama coordinates.
    pub cameras: Vec<CameraParams>,
    pub warper_scale: f64,
    /// Crop window in LOW-tier panorama coordinates, `None` when cropping
    /// was disabled.
    pub crop_rect: Option<Rect>,
    /// Carved LOW-tier seam masks, index-aligned with the frames.
    pub seam_masks: Vec<MaskU8>,
    /// Per-image gains; empty when exposure compensation was disabled.
    pub gains: Vec<f64>,
    /// FINAL-tier footprints of the first composition.
    pub final_corners: Vec<PointI>,
    pub final_sizes: Vec<SizeI>,
}

/// Result of a full stitch run.
#[derive(Clone, Debug)]
pub struct StitchOutput {
    pub panorama: Panorama,
    pub report: StitchReport,
    pub geometry: StitchGeometry,
}

/// The stitching pipeline, configured once and reusable across image sets.
///
/// [`Stitcher::new`] is the only constructor, so every instance holds a
/// validated configuration.
#[derive(Clone, Debug)]
pub struct Stitcher {
    params: StitcherParams,
}

impl Stitcher {
    /// Validate the configuration up front; bad settings fail here rather
    /// than mid-pipeline.
    pub fn new(params: StitcherParams) -> Result<Stitcher> {
        params.validate()?;
        Ok(Stitcher { params })
    }

    pub fn params(&self) -> &StitcherParams {
        &self.params
    }

    /// Run the full pipeline over `frames`.
    pub fn stitch(&self, frames: FrameSet) -> Result<StitchOutput> {
        let t0 = Instant::now();
        let mut timings = StageTimings::default();
        let num_input_images = frames.len();

        let stage = pipeline::FeatureStage::new(frames)?;
        let stage = stage.detect(&self.params.detector_params, &mut timings);
        let stage = stage.match_pairs(&self.params.matcher, &mut timings)?;

        // Diagnostics over the full input set, before anything is pruned.
        let confidence_matrix = stage.confidence_matrix();
        let match_graph = stage.dot_graph(self.params.confidence_threshold);

        let stage = stage.subset(self.params.confidence_threshold, &mut timings)?;
        let kept_indices = stage.kept().to_vec();
        let stage = stage.solve(
            self.params.adjuster,
            self.params.wave_correct,
            &mut timings,
        )?;
        let stage = stage.warp(&mut timings)?;
        let stage = stage.crop(self.params.crop, &mut timings)?;
        let (mut geometry, frames) = stage.finish(
            &self.params.seam,
            self.params.compensate_exposure,
            &mut timings,
        )?;

        let (panorama, corners, sizes) =
            pipeline::compose(&geometry, &frames, self.params.crop, &mut timings)?;
        geometry.final_corners = corners;
        geometry.final_sizes = sizes;
        timings.total_ms = elapsed_ms(t0);
        debug!(
            "stitched {} of {} images into {}x{} in {:.1} ms",
            geometry.num_frames,
            num_input_images,
            panorama.image.w,
            panorama.image.h,
            timings.total_ms
        );

        let report = StitchReport {
            num_input_images,
            kept_indices,
            confidence_threshold: self.params.confidence_threshold,
            confidence_matrix,
            match_graph,
            cameras: geometry.cameras.iter().map(|c| c.transform).collect(),
            crop_rect: geometry.crop_rect,
            panorama_size: panorama.size(),
            timings,
        };
        Ok(StitchOutput {
            panorama,
            report,
            geometry,
        })
    }

    /// Re-blend a new image set with frozen geometry.
    ///
    /// `frames` must be index-aligned with the set the geometry was frozen
    /// for (same count, same capture positions); a count mismatch is
    /// `UnreadyState`. Repeated calls with identical inputs produce
    /// pixel-identical panoramas.
    pub fn apply_to_new(
        geometry: &StitchGeometry,
        frames: FrameSet,
        crop: bool,
    ) -> Result<Panorama> {
        let mut timings = StageTimings::default();
        let (panorama, _, _) = pipeline::compose(geometry, &frames, crop, &mut timings)?;
        Ok(panorama)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StitchError;

    #[test]
    fn bad_config_fails_at_construction() {
        let mut params = StitcherParams::default();
        params.confidence_threshold = -1.0;
        assert!(matches!(
            Stitcher::new(params).unwrap_err(),
            StitchError::Config(_)
        ));
    }
}
