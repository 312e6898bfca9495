//! Staged stitch contexts.
//!
//! Each stage value owns everything its successors are allowed to see and
//! is consumed by the call producing the next stage, so running the
//! pipeline out of order does not compile. Timing is recorded into the
//! shared [`StageTimings`] as stages run.

use crate::blend::Blender;
use crate::camera::{self, CameraParams, WaveCorrectKind};
use crate::crop::Cropper;
use crate::diagnostics::{elapsed_ms, StageTimings};
use crate::error::{Result, StitchError};
use crate::exposure::GainCompensator;
use crate::features::{self, DetectorParams, FeatureSet};
use crate::frames::{FrameSet, ResolutionTier};
use crate::graph;
use crate::image::{ImageF32, MaskU8};
use crate::matching::{self, MatcherParams, MatchSet};
use crate::seam::{self, SeamParams};
use crate::types::{PointI, SizeI};
use crate::warp::AffineWarper;
use log::debug;
use std::time::Instant;

use super::params::AdjusterKind;
use super::{Panorama, StitchGeometry};

/// Stage 2 input: a loaded frame set.
pub(crate) struct FeatureStage {
    frames: FrameSet,
}

impl FeatureStage {
    pub fn new(frames: FrameSet) -> Result<FeatureStage> {
        if frames.len() < 2 {
            return Err(StitchError::InsufficientOverlap(format!(
                "stitching needs at least 2 images, got {}",
                frames.len()
            )));
        }
        Ok(FeatureStage { frames })
    }

    pub fn detect(self, params: &DetectorParams, timings: &mut StageTimings) -> MatchStage {
        let t = Instant::now();
        let images: Vec<&ImageF32> = self.frames.frames().iter().map(|f| &f.medium).collect();
        let features = features::detect_all(&images, params);
        timings.find_features_ms = elapsed_ms(t);
        debug!(
            "detected features: {:?}",
            features.iter().map(FeatureSet::len).collect::<Vec<_>>()
        );
        MatchStage {
            frames: self.frames,
            features,
        }
    }
}

pub(crate) struct MatchStage {
    frames: FrameSet,
    features: Vec<FeatureSet>,
}

impl MatchStage {
    pub fn match_pairs(
        self,
        params: &MatcherParams,
        timings: &mut StageTimings,
    ) -> Result<SubsetStage> {
        let t = Instant::now();
        let matches = matching::match_features(&self.features, params)?;
        timings.match_ms = elapsed_ms(t);
        Ok(SubsetStage {
            frames: self.frames,
            matches,
        })
    }
}

pub(crate) struct SubsetStage {
    frames: FrameSet,
    matches: MatchSet,
}

impl SubsetStage {
    /// Pre-subset diagnostics over the full input set.
    pub fn confidence_matrix(&self) -> Vec<Vec<f64>> {
        self.matches.confidence_matrix()
    }

    pub fn dot_graph(&self, threshold: f64) -> String {
        graph::to_dot(&self.frames.names(), &self.matches, threshold)
    }

    /// Keep only the largest connected component of the match graph.
    pub fn subset(mut self, threshold: f64, timings: &mut StageTimings) -> Result<CameraStage> {
        let t = Instant::now();
        let kept = graph::indices_to_keep(&self.matches, threshold)?;
        if kept.len() < 2 {
            return Err(StitchError::InsufficientOverlap(format!(
                "largest connected component holds {} of {} images",
                kept.len(),
                self.frames.len()
            )));
        }
        debug!("keeping {kept:?} of {} images", self.frames.len());
        self.frames.subset(&kept);
        let matches = self.matches.subset(&kept);
        timings.subset_ms = elapsed_ms(t);
        Ok(CameraStage {
            frames: self.frames,
            matches,
            kept,
        })
    }
}

pub(crate) struct CameraStage {
    frames: FrameSet,
    matches: MatchSet,
    kept: Vec<usize>,
}

impl CameraStage {
    pub fn kept(&self) -> &[usize] {
        &self.kept
    }

    /// Estimate, optionally adjust, and wave-correct the cameras.
    pub fn solve(
        self,
        adjuster: AdjusterKind,
        wave: WaveCorrectKind,
        timings: &mut StageTimings,
    ) -> Result<WarpStage> {
        let t = Instant::now();
        let cameras = camera::estimate(&self.matches)?;
        timings.estimate_ms = elapsed_ms(t);

        let t = Instant::now();
        let cameras = match adjuster {
            AdjusterKind::Affine => camera::adjust(&self.matches, &cameras)?,
            AdjusterKind::No => cameras,
        };
        let cameras = camera::wave_correct(&cameras, wave);
        timings.adjust_ms = elapsed_ms(t);

        Ok(WarpStage {
            frames: self.frames,
            cameras,
        })
    }
}

pub(crate) struct WarpStage {
    frames: FrameSet,
    cameras: Vec<CameraParams>,
}

impl WarpStage {
    /// Warp the LOW tier into panorama space for the geometric estimates.
    pub fn warp(self, timings: &mut StageTimings) -> Result<CropStage> {
        let t = Instant::now();
        let mut warper = AffineWarper::default();
        warper.set_scale(&self.cameras);

        let aspect = self.frames.ratio(ResolutionTier::Medium, ResolutionTier::Low);
        let mut low_images = Vec::with_capacity(self.frames.len());
        let mut low_masks = Vec::with_capacity(self.frames.len());
        let mut low_corners = Vec::with_capacity(self.frames.len());
        for (frame, cam) in self.frames.frames().iter().zip(&self.cameras) {
            let (img, corner) = warper.warp_image(&frame.low, cam, aspect)?;
            let (mask, _) = warper.warp_mask(frame.tier_size(ResolutionTier::Low), cam, aspect)?;
            low_images.push(img);
            low_masks.push(mask);
            low_corners.push(corner);
        }
        timings.warp_ms = elapsed_ms(t);
        Ok(CropStage {
            frames: self.frames,
            cameras: self.cameras,
            warper,
            low_images,
            low_masks,
            low_corners,
        })
    }
}

pub(crate) struct CropStage {
    frames: FrameSet,
    cameras: Vec<CameraParams>,
    warper: AffineWarper,
    low_images: Vec<ImageF32>,
    low_masks: Vec<MaskU8>,
    low_corners: Vec<PointI>,
}

impl CropStage {
    /// Shrink the LOW stacks to the largest interior rectangle of their
    /// union, or pass through when cropping is disabled.
    pub fn crop(mut self, enabled: bool, timings: &mut StageTimings) -> Result<SeamStage> {
        let t = Instant::now();
        let cropper = if enabled {
            let cropper = Cropper::prepare(&self.low_masks, &self.low_corners)?;
            let sizes: Vec<SizeI> = self
                .low_masks
                .iter()
                .map(|m| SizeI::new(m.w as i32, m.h as i32))
                .collect();
            let (corners, _) = cropper.crop_rois(&self.low_corners, &sizes, 1.0)?;
            for idx in 0..self.low_images.len() {
                self.low_images[idx] =
                    cropper.crop_image(&self.low_images[idx], self.low_corners[idx], 1.0)?;
                self.low_masks[idx] =
                    cropper.crop_mask(&self.low_masks[idx], self.low_corners[idx], 1.0)?;
            }
            self.low_corners = corners;
            Some(cropper)
        } else {
            None
        };
        timings.crop_ms = elapsed_ms(t);
        Ok(SeamStage {
            frames: self.frames,
            cameras: self.cameras,
            warper: self.warper,
            low_images: self.low_images,
            low_masks: self.low_masks,
            low_corners: self.low_corners,
            cropper,
        })
    }
}

pub(crate) struct SeamStage {
    frames: FrameSet,
    cameras: Vec<CameraParams>,
    warper: AffineWarper,
    low_images: Vec<ImageF32>,
    low_masks: Vec<MaskU8>,
    low_corners: Vec<PointI>,
    cropper: Option<Cropper>,
}

impl SeamStage {
    /// Estimate gains, carve seams, and freeze the geometry.
    pub fn finish(
        mut self,
        seam_params: &SeamParams,
        compensate_exposure: bool,
        timings: &mut StageTimings,
    ) -> Result<(StitchGeometry, FrameSet)> {
        let t = Instant::now();
        let gains = if compensate_exposure {
            let mut compensator = GainCompensator::default();
            compensator.feed(&self.low_corners, &self.low_images, &self.low_masks)?;
            compensator.gains().to_vec()
        } else {
            Vec::new()
        };
        timings.exposure_ms = elapsed_ms(t);

        let t = Instant::now();
        seam::find_seams(
            &self.low_images,
            &self.low_corners,
            &mut self.low_masks,
            seam_params,
        )?;
        timings.seam_ms = elapsed_ms(t);

        let geometry = StitchGeometry {
            num_frames: self.frames.len(),
            cameras: self.cameras,
            warper_scale: self.warper.scale(),
            crop_rect: self.cropper.map(|c| c.rect()),
            seam_masks: self.low_masks,
            gains,
            final_corners: Vec::new(),
            final_sizes: Vec::new(),
        };
        Ok((geometry, self.frames))
    }
}

/// Warp, crop, compensate and blend the FINAL tier with frozen geometry.
///
/// Shared by the first stitch and the incremental re-blend path, so both
/// produce pixel-identical output for identical inputs.
pub(crate) fn compose(
    geometry: &StitchGeometry,
    frames: &FrameSet,
    crop: bool,
    timings: &mut StageTimings,
) -> Result<(Panorama, Vec<PointI>, Vec<SizeI>)> {
    if frames.len() != geometry.num_frames {
        return Err(StitchError::UnreadyState(
            "frame count does not match the frozen geometry",
        ));
    }

    let t = Instant::now();
    let warper = AffineWarper::with_scale(geometry.warper_scale);
    let aspect = frames.ratio(ResolutionTier::Medium, ResolutionTier::Final);
    let mut images = Vec::with_capacity(frames.len());
    let mut masks = Vec::with_capacity(frames.len());
    let mut corners = Vec::with_capacity(frames.len());
    for (frame, cam) in frames.frames().iter().zip(&geometry.cameras) {
        let (img, corner) = warper.warp_image(&frame.full, cam, aspect)?;
        let (mask, _) = warper.warp_mask(frame.tier_size(ResolutionTier::Final), cam, aspect)?;
        images.push(img);
        masks.push(mask);
        corners.push(corner);
    }
    timings.warp_ms += elapsed_ms(t);

    if crop {
        let t = Instant::now();
        let rect = geometry.crop_rect.ok_or(StitchError::UnreadyState(
            "geometry was frozen without a crop window",
        ))?;
        let cropper = Cropper::from_rect(rect);
        let aspect = frames.ratio(ResolutionTier::Low, ResolutionTier::Final);
        let sizes: Vec<SizeI> = masks
            .iter()
            .map(|m| SizeI::new(m.w as i32, m.h as i32))
            .collect();
        let (new_corners, _) = cropper.crop_rois(&corners, &sizes, aspect)?;
        for idx in 0..images.len() {
            images[idx] = cropper.crop_image(&images[idx], corners[idx], aspect)?;
            masks[idx] = cropper.crop_mask(&masks[idx], corners[idx], aspect)?;
        }
        corners = new_corners;
        timings.crop_ms += elapsed_ms(t);
    }

    if !geometry.gains.is_empty() {
        let t = Instant::now();
        let compensator = GainCompensator::from_gains(geometry.gains.clone());
        for (idx, image) in images.iter_mut().enumerate() {
            compensator.apply(idx, image)?;
        }
        timings.exposure_ms += elapsed_ms(t);
    }

    // Seam masks were carved on the (possibly cropped) LOW stacks; they only
    // align with the FINAL stacks when the crop setting matches. A mismatch
    // falls back to plain validity masks, resolving overlaps by feed order.
    let seams_align = crop == geometry.crop_rect.is_some();
    let blend_masks: Vec<MaskU8> = if seams_align {
        geometry
            .seam_masks
            .iter()
            .zip(&masks)
            .map(|(seam_mask, valid)| seam::resize_seam(seam_mask, valid))
            .collect()
    } else {
        masks.clone()
    };

    let t = Instant::now();
    let sizes: Vec<SizeI> = images
        .iter()
        .map(|img| SizeI::new(img.w as i32, img.h as i32))
        .collect();
    let mut blender = Blender::default();
    blender.prepare(&corners, &sizes)?;
    for ((image, mask), corner) in images.iter().zip(&blend_masks).zip(&corners) {
        blender.feed(image, mask, *corner)?;
    }
    let (image, mask) = blender.blend()?;
    timings.blend_ms += elapsed_ms(t);

    Ok((Panorama { image, mask }, corners, sizes))
}
