//! Seam estimation between overlapping warped images (stage 8).
//!
//! For every geometrically overlapping pair a single monotone seam is found
//! by dynamic programming over a cost grid combining intensity difference
//! and Sobel gradient magnitude. The seam partitions the contested pixels
//! (valid in both masks) between the two images; pixels valid in only one
//! mask keep their owner. Seams are searched on the LOW tier and lifted to
//! the blend tier with [`resize_seam`].

mod grad;

pub use grad::sobel_magnitude;

use crate::error::{Result, StitchError};
use crate::image::{ImageF32, MaskU8};
use crate::types::{PointI, Rect};
use log::debug;

/// Cost assigned to overlap pixels that are not valid in both masks. High
/// enough that the seam stays inside contested territory whenever possible.
const UNCONTESTED_COST: f32 = 1e3;

/// Seam cost weights.
#[derive(Clone, Copy, Debug)]
pub struct SeamParams {
    /// Weight of the Sobel magnitude term relative to the intensity
    /// difference. Pushes seams away from structured image content.
    pub grad_weight: f32,
}

impl Default for SeamParams {
    fn default() -> Self {
        Self { grad_weight: 2.0 }
    }
}

/// Carve pairwise seams into `masks` in place.
///
/// `images`, `corners` and `masks` are the warped-and-cropped LOW-tier
/// stacks; all three must have the same length and each mask must be
/// pixel-registered with its image.
pub fn find_seams(
    images: &[ImageF32],
    corners: &[PointI],
    masks: &mut [MaskU8],
    params: &SeamParams,
) -> Result<()> {
    let n = images.len();
    if n == 0 || corners.len() != n || masks.len() != n {
        return Err(StitchError::UnreadyState(
            "seam search requires equal-length image, corner and mask stacks",
        ));
    }
    for (image, mask) in images.iter().zip(masks.iter()) {
        if (image.w, image.h) != (mask.w, mask.h) {
            return Err(StitchError::UnreadyState(
                "seam mask must match its image size",
            ));
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            carve_pair(images, corners, masks, i, j, params);
        }
    }
    Ok(())
}

/// Lift a LOW-tier seam mask to the blend tier: nearest-neighbour upsample
/// to the size of `valid`, then intersect with it so no seam pixel claims
/// content the final warp never produced.
pub fn resize_seam(seam: &MaskU8, valid: &MaskU8) -> MaskU8 {
    let mut lifted = seam.resize_nearest(valid.w, valid.h);
    lifted.intersect_with(valid);
    lifted
}

fn carve_pair(
    images: &[ImageF32],
    corners: &[PointI],
    masks: &mut [MaskU8],
    i: usize,
    j: usize,
    params: &SeamParams,
) {
    let rect_i = Rect::new(
        corners[i].x,
        corners[i].y,
        images[i].w as i32,
        images[i].h as i32,
    );
    let rect_j = Rect::new(
        corners[j].x,
        corners[j].y,
        images[j].w as i32,
        images[j].h as i32,
    );
    let overlap = rect_i.intersect(&rect_j);
    if overlap.is_empty() {
        return;
    }

    let ow = overlap.w as usize;
    let oh = overlap.h as usize;
    let oi = (
        (overlap.x - corners[i].x) as usize,
        (overlap.y - corners[i].y) as usize,
    );
    let oj = (
        (overlap.x - corners[j].x) as usize,
        (overlap.y - corners[j].y) as usize,
    );

    // Contested pixels: valid in both masks before this pair's carve.
    let mut contested = MaskU8::new(ow, oh);
    let mut any = false;
    for y in 0..oh {
        for x in 0..ow {
            let both = masks[i].get(oi.0 + x, oi.1 + y) && masks[j].get(oj.0 + x, oj.1 + y);
            contested.set(x, y, both);
            any |= both;
        }
    }
    if !any {
        return;
    }

    let patch_i = images[i].crop(oi.0, oi.1, ow, oh);
    let patch_j = images[j].crop(oj.0, oj.1, ow, oh);
    let mag_i = sobel_magnitude(&patch_i);
    let mag_j = sobel_magnitude(&patch_j);

    let mut cost = ImageF32::new(ow, oh);
    for y in 0..oh {
        let row = cost.row_mut(y);
        for (x, c) in row.iter_mut().enumerate() {
            *c = if contested.get(x, y) {
                (patch_i.get(x, y) - patch_j.get(x, y)).abs()
                    + params.grad_weight * (mag_i.get(x, y) + mag_j.get(x, y))
            } else {
                UNCONTESTED_COST
            };
        }
    }

    // Seam orientation follows the dominant center offset: images side by
    // side get a vertical seam, stacked images a horizontal one.
    let dx = 2 * (corners[j].x - corners[i].x) + images[j].w as i32 - images[i].w as i32;
    let dy = 2 * (corners[j].y - corners[i].y) + images[j].h as i32 - images[i].h as i32;
    if dx.abs() >= dy.abs() {
        let seam = monotone_seam(&cost);
        let i_first = dx >= 0; // image i keeps the left side
        debug!("vertical seam between {i} and {j} over {ow}x{oh} overlap");
        for (y, &sx) in seam.iter().enumerate() {
            for x in 0..ow {
                if !contested.get(x, y) {
                    continue;
                }
                let keep_i = (x <= sx) == i_first;
                if keep_i {
                    masks[j].set(oj.0 + x, oj.1 + y, false);
                } else {
                    masks[i].set(oi.0 + x, oi.1 + y, false);
                }
            }
        }
    } else {
        let transposed = transpose(&cost);
        let seam = monotone_seam(&transposed);
        let i_first = dy >= 0; // image i keeps the top side
        debug!("horizontal seam between {i} and {j} over {ow}x{oh} overlap");
        for (x, &sy) in seam.iter().enumerate() {
            for y in 0..oh {
                if !contested.get(x, y) {
                    continue;
                }
                let keep_i = (y <= sy) == i_first;
                if keep_i {
                    masks[j].set(oj.0 + x, oj.1 + y, false);
                } else {
                    masks[i].set(oi.0 + x, oi.1 + y, false);
                }
            }
        }
    }
}

/// Minimum-cost monotone path from the top row to the bottom row, moving at
/// most one column per step. Returns the chosen column per row.
fn monotone_seam(cost: &ImageF32) -> Vec<usize> {
    let w = cost.w;
    let h = cost.h;
    debug_assert!(w > 0 && h > 0);

    let mut acc = vec![0.0f32; w * h];
    acc[..w].copy_from_slice(cost.row(0));
    for y in 1..h {
        for x in 0..w {
            let lo = x.saturating_sub(1);
            let hi = (x + 1).min(w - 1);
            let mut best = f32::INFINITY;
            for px in lo..=hi {
                best = best.min(acc[(y - 1) * w + px]);
            }
            acc[y * w + x] = cost.get(x, y) + best;
        }
    }

    let mut seam = vec![0usize; h];
    let last = &acc[(h - 1) * w..];
    let mut x = last
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    seam[h - 1] = x;
    for y in (0..h - 1).rev() {
        let lo = x.saturating_sub(1);
        let hi = (x + 1).min(w - 1);
        let mut best_x = lo;
        for px in lo..=hi {
            if acc[y * w + px] < acc[y * w + best_x] {
                best_x = px;
            }
        }
        x = best_x;
        seam[y] = x;
    }
    seam
}

fn transpose(img: &ImageF32) -> ImageF32 {
    let mut out = ImageF32::new(img.h, img.w);
    for y in 0..img.h {
        for x in 0..img.w {
            out.set(y, x, img.get(x, y));
        }
    }
    out
}
