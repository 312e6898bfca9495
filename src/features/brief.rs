//! Binary intensity-comparison descriptors.
//!
//! 256 point-pair comparisons inside a fixed square window around the
//! keypoint. The pair layout is generated once from a fixed xorshift seed,
//! so descriptors are reproducible across runs and platforms. The target
//! domain constrains motion to affine maps of fronto-parallel scans, so the
//! pattern is not rotated per keypoint.

use super::Keypoint;
use crate::image::ImageF32;
use std::sync::OnceLock;

/// Descriptor length in bytes (256 comparisons).
pub const DESCRIPTOR_BYTES: usize = 32;

/// Half-width of the sampling window.
pub(super) const PATTERN_RADIUS: i32 = 13;

const PATTERN_SEED: u32 = 0x9e37_79b9;

type PatternPair = (i32, i32, i32, i32);

fn pattern() -> &'static [PatternPair; DESCRIPTOR_BYTES * 8] {
    static PATTERN: OnceLock<[PatternPair; DESCRIPTOR_BYTES * 8]> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut state = PATTERN_SEED;
        let mut next_offset = || {
            // xorshift32; maps into [-PATTERN_RADIUS, PATTERN_RADIUS]
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % (2 * PATTERN_RADIUS as u32 + 1)) as i32 - PATTERN_RADIUS
        };
        let mut pairs = [(0, 0, 0, 0); DESCRIPTOR_BYTES * 8];
        for pair in pairs.iter_mut() {
            *pair = (next_offset(), next_offset(), next_offset(), next_offset());
        }
        pairs
    })
}

/// Compute the descriptor for a keypoint; samples outside the image clamp
/// to the border.
pub(super) fn describe(image: &ImageF32, keypoint: &Keypoint) -> [u8; DESCRIPTOR_BYTES] {
    let x = keypoint.x as i32;
    let y = keypoint.y as i32;
    let sample = |dx: i32, dy: i32| -> f32 {
        let px = (x + dx).clamp(0, image.w as i32 - 1) as usize;
        let py = (y + dy).clamp(0, image.h as i32 - 1) as usize;
        image.get(px, py)
    };

    let mut descriptor = [0u8; DESCRIPTOR_BYTES];
    for (byte_idx, byte_pairs) in pattern().chunks(8).enumerate() {
        let mut byte_val = 0u8;
        for (bit_idx, &(dx1, dy1, dx2, dy2)) in byte_pairs.iter().enumerate() {
            if sample(dx1, dy1) < sample(dx2, dy2) {
                byte_val |= 1 << bit_idx;
            }
        }
        descriptor[byte_idx] = byte_val;
    }
    descriptor
}

/// Hamming distance between two descriptors.
pub fn hamming(a: &[u8; DESCRIPTOR_BYTES], b: &[u8; DESCRIPTOR_BYTES]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_of_identical_is_zero() {
        let d = [0xABu8; DESCRIPTOR_BYTES];
        assert_eq!(hamming(&d, &d), 0);
    }

    #[test]
    fn hamming_counts_flipped_bits() {
        let a = [0u8; DESCRIPTOR_BYTES];
        let mut b = [0u8; DESCRIPTOR_BYTES];
        b[0] = 0b0000_1111;
        assert_eq!(hamming(&a, &b), 4);
    }

    #[test]
    fn pattern_is_stable() {
        let first = *pattern();
        let second = *pattern();
        assert_eq!(first[..8], second[..8]);
    }
}
