//! FAST-style corner test on single-channel float images.
//!
//! A pixel is a corner when at least 9 contiguous pixels of its 16-pixel
//! Bresenham ring are all brighter or all darker than the centre by the
//! configured contrast. Responses come from the local intensity variance,
//! and a coarse grid keeps only the strongest corner per neighbourhood.

use super::Keypoint;
use crate::image::ImageF32;
use std::collections::HashSet;

/// Radius of the ring test; detection skips a border of this width.
pub(super) const RING_RADIUS: i32 = 3;

const RING_OFFSETS: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const MIN_ARC: usize = 9;

pub(super) fn detect_corners(image: &ImageF32, threshold: f32) -> Vec<Keypoint> {
    let w = image.w;
    let h = image.h;
    let r = RING_RADIUS as usize;
    let mut corners = Vec::new();

    for y in r..h - r {
        for x in r..w - r {
            let center = image.get(x, y);
            if !pre_check(image, x, y, center, threshold) {
                continue;
            }
            if is_corner(image, x, y, center, threshold) {
                corners.push(Keypoint {
                    x: x as f32,
                    y: y as f32,
                    response: response(image, x, y),
                });
            }
        }
    }
    corners
}

/// Cardinal-point rejection before the full ring walk.
fn pre_check(image: &ImageF32, x: usize, y: usize, center: f32, threshold: f32) -> bool {
    let cardinals = [
        image.get(x, y - 3),
        image.get(x + 3, y),
        image.get(x, y + 3),
        image.get(x - 3, y),
    ];
    let bright = cardinals.iter().filter(|&&p| p > center + threshold).count();
    let dark = cardinals.iter().filter(|&&p| p < center - threshold).count();
    bright >= 3 || dark >= 3
}

fn is_corner(image: &ImageF32, x: usize, y: usize, center: f32, threshold: f32) -> bool {
    let mut max_bright = 0usize;
    let mut max_dark = 0usize;
    let mut run_bright = 0usize;
    let mut run_dark = 0usize;

    // Walk the ring twice so wrap-around arcs are counted.
    for i in 0..RING_OFFSETS.len() * 2 {
        let (dx, dy) = RING_OFFSETS[i % RING_OFFSETS.len()];
        let px = image.get((x as i32 + dx) as usize, (y as i32 + dy) as usize);
        if px > center + threshold {
            run_bright += 1;
            run_dark = 0;
            max_bright = max_bright.max(run_bright);
        } else if px < center - threshold {
            run_dark += 1;
            run_bright = 0;
            max_dark = max_dark.max(run_dark);
        } else {
            run_bright = 0;
            run_dark = 0;
        }
    }

    max_bright >= MIN_ARC || max_dark >= MIN_ARC
}

/// Local 5×5 intensity standard deviation as the corner response.
fn response(image: &ImageF32, x: usize, y: usize) -> f32 {
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;
    let mut count = 0usize;
    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let px = x as i32 + dx;
            let py = y as i32 + dy;
            if px >= 0 && py >= 0 && (px as usize) < image.w && (py as usize) < image.h {
                let v = image.get(px as usize, py as usize);
                sum += v;
                sum_sq += v * v;
                count += 1;
            }
        }
    }
    let mean = sum / count as f32;
    (sum_sq / count as f32 - mean * mean).max(0.0).sqrt()
}

/// Keep at most one corner per grid cell, strongest first, capped at
/// `max_features`. Sorting is tie-broken on coordinates to stay stable
/// across runs.
pub(super) fn suppress_grid(
    mut corners: Vec<Keypoint>,
    radius: f32,
    max_features: usize,
) -> Vec<Keypoint> {
    if corners.is_empty() {
        return corners;
    }
    corners.sort_by(|a, b| {
        b.response
            .partial_cmp(&a.response)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.y as i64, a.x as i64).cmp(&(b.y as i64, b.x as i64)))
    });

    let mut occupied: HashSet<(i32, i32)> = HashSet::new();
    let mut selected = Vec::new();
    for corner in corners {
        let gx = (corner.x / radius) as i32;
        let gy = (corner.y / radius) as i32;
        let mut free = true;
        'scan: for dy in -1..=1 {
            for dx in -1..=1 {
                if occupied.contains(&(gx + dx, gy + dy)) {
                    free = false;
                    break 'scan;
                }
            }
        }
        if free {
            occupied.insert((gx, gy));
            selected.push(corner);
            if selected.len() >= max_features {
                break;
            }
        }
    }
    selected
}
