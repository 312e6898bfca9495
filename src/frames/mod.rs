//! Multi-resolution image set feeding the pipeline.
//!
//! Every source image is held at three tiers of the same ladder: MEDIUM for
//! feature work, LOW for seam/crop/exposure estimation, FINAL for the output
//! composite. A [`Frame`] bundles one image's buffers and identity so that
//! subsetting is a single filter over one collection, and the per-frame
//! arrays derived downstream stay index-aligned by construction.

mod resolution;

pub use resolution::{ResolutionTier, TierSettings};

use crate::error::{Result, StitchError};
use crate::image::{load_grayscale, ImageF32};
use crate::types::SizeI;
use std::path::PathBuf;

/// One source image at all three resolution tiers.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Source label (file stem or caller-provided name).
    pub name: String,
    /// Index in the original, pre-subset input ordering.
    pub original_index: usize,
    pub low: ImageF32,
    pub medium: ImageF32,
    pub full: ImageF32,
}

impl Frame {
    /// Buffer for the requested tier.
    pub fn tier(&self, tier: ResolutionTier) -> &ImageF32 {
        match tier {
            ResolutionTier::Low => &self.low,
            ResolutionTier::Medium => &self.medium,
            ResolutionTier::Final => &self.full,
        }
    }

    pub fn tier_size(&self, tier: ResolutionTier) -> SizeI {
        let img = self.tier(tier);
        SizeI::new(img.w as i32, img.h as i32)
    }
}

/// The pipeline's image set: index-aligned frames plus the tier scales all
/// of them share.
#[derive(Clone, Debug)]
pub struct FrameSet {
    frames: Vec<Frame>,
    scales: [f32; 3],
}

impl FrameSet {
    /// Load images from disk and build all tiers.
    pub fn from_paths(paths: &[PathBuf], settings: &TierSettings) -> Result<FrameSet> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            sources.push((name, load_grayscale(path)?));
        }
        Self::from_images(sources, settings)
    }

    /// Build a frame set from already-decoded grayscale buffers.
    ///
    /// Tier scales are derived from the first image's pixel count against the
    /// configured megapixel targets and shared by every frame, so tier ratios
    /// are uniform across the set.
    pub fn from_images(
        sources: Vec<(String, ImageF32)>,
        settings: &TierSettings,
    ) -> Result<FrameSet> {
        let (_, first) = sources.first().ok_or_else(|| {
            StitchError::InsufficientOverlap("image set is empty".into())
        })?;
        for (name, img) in &sources {
            if img.w == 0 || img.h == 0 {
                return Err(StitchError::Io(format!("image '{name}' has zero size")));
            }
        }
        let scales = settings.tier_scales(first.w, first.h);

        let frames = sources
            .into_iter()
            .enumerate()
            .map(|(original_index, (name, img))| {
                let resize = |scale: f32| -> ImageF32 {
                    let nw = ((img.w as f32 * scale).round() as usize).max(1);
                    let nh = ((img.h as f32 * scale).round() as usize).max(1);
                    img.resize_area(nw, nh)
                };
                let low = resize(scales[0]);
                let medium = resize(scales[1]);
                let full = resize(scales[2]);
                Frame {
                    name,
                    original_index,
                    low,
                    medium,
                    full,
                }
            })
            .collect();

        Ok(FrameSet { frames, scales })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn names(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.name.as_str()).collect()
    }

    /// Uniform scale of `tier` relative to the original input resolution.
    pub fn tier_scale(&self, tier: ResolutionTier) -> f32 {
        self.scales[tier as usize]
    }

    /// Scale factor taking coordinates at tier `from` to tier `to`.
    pub fn ratio(&self, from: ResolutionTier, to: ResolutionTier) -> f32 {
        self.tier_scale(to) / self.tier_scale(from)
    }

    /// Per-frame pixel extents at `tier`, index-aligned with `frames()`.
    pub fn scaled_sizes(&self, tier: ResolutionTier) -> Vec<SizeI> {
        self.frames.iter().map(|f| f.tier_size(tier)).collect()
    }

    /// Keep only the frames at `kept` indices (ascending), dropping the rest.
    ///
    /// Every per-frame collection derived from this set must be pruned with
    /// the same index list in the same call sequence.
    pub fn subset(&mut self, kept: &[usize]) {
        debug_assert!(kept.windows(2).all(|w| w[0] < w[1]), "kept must be ascending");
        let mut keep_iter = kept.iter().peekable();
        let mut idx = 0usize;
        self.frames.retain(|_| {
            let keep = keep_iter.peek() == Some(&&idx);
            if keep {
                keep_iter.next();
            }
            idx += 1;
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(name: &str, w: usize, h: usize, v: f32) -> (String, ImageF32) {
        (name.to_string(), ImageF32::from_raw(w, h, vec![v; w * h]))
    }

    fn tiny_settings() -> TierSettings {
        // Targets far above the test image sizes keep every tier at scale 1.
        TierSettings {
            low_megapix: 10.0,
            medium_megapix: 10.0,
            final_megapix: None,
        }
    }

    #[test]
    fn tiers_are_index_aligned_after_subset() {
        let sources = vec![
            flat("a", 8, 8, 0.1),
            flat("b", 8, 8, 0.2),
            flat("c", 8, 8, 0.3),
        ];
        let mut set = FrameSet::from_images(sources, &tiny_settings()).unwrap();
        set.subset(&[0, 2]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["a", "c"]);
        assert_eq!(set.frames()[1].original_index, 2);
    }

    #[test]
    fn ratio_between_identical_tiers_is_one() {
        let set = FrameSet::from_images(vec![flat("a", 8, 8, 0.0)], &tiny_settings()).unwrap();
        let r = set.ratio(ResolutionTier::Medium, ResolutionTier::Medium);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn megapix_targets_shrink_tiers() {
        let sources = vec![flat("a", 200, 200, 0.5)];
        let settings = TierSettings {
            low_megapix: 0.0025,  // 50x50
            medium_megapix: 0.01, // 100x100
            final_megapix: None,
        };
        let set = FrameSet::from_images(sources, &settings).unwrap();
        let f = &set.frames()[0];
        assert_eq!((f.low.w, f.low.h), (50, 50));
        assert_eq!((f.medium.w, f.medium.h), (100, 100));
        assert_eq!((f.full.w, f.full.h), (200, 200));
    }

    #[test]
    fn zero_sized_image_is_rejected_at_any_position() {
        let sources = vec![
            flat("a", 4, 4, 0.1),
            ("b".to_string(), ImageF32::new(0, 0)),
        ];
        let err = FrameSet::from_images(sources, &tiny_settings()).unwrap_err();
        assert!(matches!(err, StitchError::Io(_)));
    }

    #[test]
    fn empty_set_is_rejected() {
        let err = FrameSet::from_images(Vec::new(), &tiny_settings()).unwrap_err();
        assert!(matches!(err, StitchError::InsufficientOverlap(_)));
    }
}
