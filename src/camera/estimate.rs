//! Initial camera estimation by chaining pairwise transforms.
//!
//! Builds a maximum-confidence spanning tree of the match graph, roots it
//! at the best-connected image (its camera is the identity), and composes
//! pairwise affine maps along tree edges outward from the root.

use super::CameraParams;
use crate::error::{Result, StitchError};
use crate::matching::MatchSet;
use log::debug;
use std::collections::VecDeque;

/// Estimate one camera per image from the pairwise matches.
///
/// Requires at least two images and a connected match graph over all of
/// them (the subsetter guarantees connectivity for kept indices).
pub fn estimate(matches: &MatchSet) -> Result<Vec<CameraParams>> {
    let n = matches.num_images();
    if n < 2 {
        return Err(StitchError::InsufficientOverlap(format!(
            "panorama requires at least 2 images, got {n}"
        )));
    }

    let root = best_connected(matches);
    let tree = spanning_tree(matches, root)?;

    let mut cameras = vec![CameraParams::identity(); n];
    let mut visited = vec![false; n];
    visited[root] = true;
    let mut queue = VecDeque::from([root]);
    while let Some(parent) = queue.pop_front() {
        for &child in &tree[parent] {
            if visited[child] {
                continue;
            }
            let oriented = matches.oriented(child, parent).ok_or_else(|| {
                StitchError::InsufficientOverlap(format!(
                    "no usable correspondences between images {child} and {parent}"
                ))
            })?;
            // child pixels -> parent pixels -> panorama
            cameras[child].transform = cameras[parent].transform * oriented.transform;
            visited[child] = true;
            queue.push_back(child);
        }
    }

    if let Some(unreached) = visited.iter().position(|&v| !v) {
        return Err(StitchError::InsufficientOverlap(format!(
            "match graph is disconnected: image {unreached} unreachable from root {root}"
        )));
    }
    debug!("estimated {n} cameras, root image {root}");
    Ok(cameras)
}

/// Image with the highest total pairwise confidence.
fn best_connected(matches: &MatchSet) -> usize {
    let n = matches.num_images();
    let mut totals = vec![0.0f64; n];
    for pair in matches.pairs() {
        totals[pair.i] += pair.confidence;
        totals[pair.j] += pair.confidence;
    }
    totals
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Maximum-confidence spanning tree as adjacency lists (Prim's algorithm,
/// greedy over edge confidence).
fn spanning_tree(matches: &MatchSet, root: usize) -> Result<Vec<Vec<usize>>> {
    let n = matches.num_images();
    let mut in_tree = vec![false; n];
    let mut tree = vec![Vec::new(); n];
    in_tree[root] = true;

    for _ in 1..n {
        let mut best: Option<(usize, usize, f64)> = None;
        for pair in matches.pairs() {
            if pair.confidence <= 0.0 {
                continue;
            }
            let crossing = in_tree[pair.i] != in_tree[pair.j];
            if crossing && best.map_or(true, |(_, _, c)| pair.confidence > c) {
                best = Some((pair.i, pair.j, pair.confidence));
            }
        }
        let (i, j, _) = best.ok_or_else(|| {
            StitchError::InsufficientOverlap(
                "match graph is disconnected; cannot chain cameras".into(),
            )
        })?;
        tree[i].push(j);
        tree[j].push(i);
        in_tree[i] = true;
        in_tree[j] = true;
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{MatchSet, PairMatch};
    use nalgebra::Matrix3;

    fn translation(dx: f64, dy: f64) -> Matrix3<f64> {
        let mut m = Matrix3::identity();
        m[(0, 2)] = dx;
        m[(1, 2)] = dy;
        m
    }

    fn pair(i: usize, j: usize, transform: Matrix3<f64>, confidence: f64) -> PairMatch {
        PairMatch {
            i,
            j,
            num_matches: 20,
            transform,
            inliers: Vec::new(),
            confidence,
        }
    }

    #[test]
    fn chains_translations_along_tree() {
        // 0 -> 1 shifted by (50, 0); 1 -> 2 shifted by (50, 0).
        let matches = MatchSet::from_pairs(
            3,
            vec![
                pair(0, 1, translation(50.0, 0.0), 2.0),
                pair(1, 2, translation(50.0, 0.0), 3.0),
            ],
        );
        let cameras = estimate(&matches).unwrap();
        // Relative offset between consecutive cameras must match the pairwise shift.
        let rel01 = cameras[1].transform.try_inverse().unwrap() * cameras[0].transform;
        assert!((rel01[(0, 2)] - 50.0).abs() < 1e-9);
        let rel12 = cameras[2].transform.try_inverse().unwrap() * cameras[1].transform;
        assert!((rel12[(0, 2)] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn single_image_fails_fast() {
        let matches = MatchSet::from_pairs(1, Vec::new());
        assert!(matches!(
            estimate(&matches).unwrap_err(),
            StitchError::InsufficientOverlap(_)
        ));
    }

    #[test]
    fn disconnected_graph_fails() {
        let matches = MatchSet::from_pairs(3, vec![pair(0, 1, translation(10.0, 0.0), 2.0)]);
        assert!(matches!(
            estimate(&matches).unwrap_err(),
            StitchError::InsufficientOverlap(_)
        ));
    }
}
