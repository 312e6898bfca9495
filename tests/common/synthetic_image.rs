//! Synthetic scan-map fixtures for the integration tests.

use map_stitcher::image::ImageF32;
use map_stitcher::{FrameSet, TierSettings};

/// Checkerboard with per-cell intensity jitter derived from the cell
/// coordinates and `seed`. The high-contrast cell borders feed the corner
/// detector; the jitter makes every neighbourhood distinctive, so
/// descriptors match by position rather than by board period.
pub fn shaded_checkerboard(width: usize, height: usize, cell: usize, seed: u32) -> ImageF32 {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(cell > 0, "cell size must be positive");

    let mut img = ImageF32::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let cx = (x / cell) as u32;
            let cy = (y / cell) as u32;
            let base = if (cx + cy) & 1 == 0 { 0.2 } else { 0.8 };
            let h = hash3(cx, cy, seed);
            let jitter = ((h % 256) as f32 / 255.0 - 0.5) * 0.25;
            img.set(x, y, base + jitter);
        }
    }
    img
}

/// Frame set of `w × h` crops of `scene` at the given top-left offsets.
pub fn crops_as_frames(
    scene: &ImageF32,
    offsets: &[(usize, usize)],
    w: usize,
    h: usize,
) -> FrameSet {
    let sources: Vec<(String, ImageF32)> = offsets
        .iter()
        .enumerate()
        .map(|(idx, &(x, y))| (format!("crop{idx}"), scene.crop(x, y, w, h)))
        .collect();
    FrameSet::from_images(sources, &full_resolution_tiers()).expect("non-empty crop list")
}

/// Tier settings keeping LOW == MEDIUM == FINAL == input resolution, so
/// recovered translations compare directly against the crop offsets.
pub fn full_resolution_tiers() -> TierSettings {
    TierSettings {
        low_megapix: 10.0,
        medium_megapix: 10.0,
        final_megapix: None,
    }
}

fn hash3(x: u32, y: u32, seed: u32) -> u32 {
    let mut v = x
        .wrapping_mul(0x9e37_79b9)
        .wrapping_add(y.wrapping_mul(0x85eb_ca6b))
        .wrapping_add(seed.wrapping_mul(0xc2b2_ae35));
    v ^= v >> 16;
    v = v.wrapping_mul(0x7feb_352d);
    v ^= v >> 15;
    v = v.wrapping_mul(0x846c_a68b);
    v ^= v >> 16;
    v
}
