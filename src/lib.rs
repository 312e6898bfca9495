#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod diagnostics;
pub mod error;
pub mod frames;
pub mod image;
pub mod stitcher;
pub mod types;

// Stage modules, public for tools and advanced users but considered
// unstable internals.
pub mod blend;
pub mod camera;
pub mod crop;
pub mod exposure;
pub mod features;
pub mod graph;
pub mod matching;
pub mod seam;
pub mod warp;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{Result, StitchError};
pub use crate::frames::{Frame, FrameSet, ResolutionTier, TierSettings};
pub use crate::stitcher::{
    Panorama, StitchGeometry, StitchOutput, Stitcher, StitcherParams,
};

pub use crate::diagnostics::{StageTimings, StitchReport};

/// Small prelude for quick experiments.
pub mod prelude {
    pub use crate::error::{Result, StitchError};
    pub use crate::frames::{FrameSet, ResolutionTier, TierSettings};
    pub use crate::image::{ImageF32, MaskU8};
    pub use crate::stitcher::{Panorama, StitchOutput, Stitcher, StitcherParams};
}
