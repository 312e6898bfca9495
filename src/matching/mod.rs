//! Pairwise affine-consistent feature matching (stage 3).
//!
//! For every unordered image pair the matcher runs a mutual Hamming
//! nearest-neighbour search with a ratio test, fits an affine map with
//! RANSAC, and scores the pair with the inlier-based confidence the
//! subsetter thresholds on. Matching is a pure function of the feature
//! sets; pairs without a usable fit simply have no entry (confidence 0).

pub mod affine;
pub mod ransac;

pub use affine::PointPair;
pub use ransac::RansacParams;

use crate::error::{Result, StitchError};
use crate::features::{hamming, FeatureSet};
use log::debug;
use nalgebra::Matrix3;
use rayon::prelude::*;

/// Matcher configuration (affine motion model only).
#[derive(Clone, Copy, Debug)]
pub struct MatcherParams {
    /// Lowe ratio gate between best and second-best descriptor distance.
    pub ratio: f32,
    /// Hard gate on the best Hamming distance.
    pub max_distance: u32,
    /// Minimum RANSAC inliers for a pair to count as overlapping.
    pub min_inliers: usize,
    pub ransac: RansacParams,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            ratio: 0.8,
            max_distance: 80,
            min_inliers: 6,
            ransac: RansacParams::default(),
        }
    }
}

/// Accepted match between images `i < j`: the affine map taking MEDIUM-tier
/// pixels of `i` into `j`, its inlier correspondences, and the confidence.
#[derive(Clone, Debug)]
pub struct PairMatch {
    pub i: usize,
    pub j: usize,
    /// Putative correspondences surviving the ratio/mutual gates.
    pub num_matches: usize,
    pub transform: Matrix3<f64>,
    pub inliers: Vec<PointPair>,
    pub confidence: f64,
}

/// A pair match oriented for a specific query order.
#[derive(Clone, Debug)]
pub struct OrientedMatch {
    /// Affine map taking the first queried image's pixels into the second's.
    pub transform: Matrix3<f64>,
    pub inliers: Vec<PointPair>,
    pub confidence: f64,
}

/// Sparse symmetric match matrix over image pairs.
#[derive(Clone, Debug, Default)]
pub struct MatchSet {
    num_images: usize,
    pairs: Vec<PairMatch>,
}

impl MatchSet {
    /// Assemble a match set from already-scored pairs (`i < j` each).
    pub fn from_pairs(num_images: usize, mut pairs: Vec<PairMatch>) -> MatchSet {
        pairs.sort_by_key(|p| (p.i, p.j));
        MatchSet { num_images, pairs }
    }

    pub fn num_images(&self) -> usize {
        self.num_images
    }

    pub fn pairs(&self) -> &[PairMatch] {
        &self.pairs
    }

    /// Confidence between `i` and `j`; symmetric, zero when unmatched.
    pub fn confidence(&self, i: usize, j: usize) -> f64 {
        let (a, b) = if i <= j { (i, j) } else { (j, i) };
        self.pairs
            .iter()
            .find(|p| p.i == a && p.j == b)
            .map_or(0.0, |p| p.confidence)
    }

    /// Match oriented from `i` to `j` (transform inverted when the stored
    /// order is the other way around).
    pub fn oriented(&self, i: usize, j: usize) -> Option<OrientedMatch> {
        let (a, b) = if i <= j { (i, j) } else { (j, i) };
        let pair = self.pairs.iter().find(|p| p.i == a && p.j == b)?;
        if i <= j {
            Some(OrientedMatch {
                transform: pair.transform,
                inliers: pair.inliers.clone(),
                confidence: pair.confidence,
            })
        } else {
            let inverse = pair.transform.try_inverse()?;
            Some(OrientedMatch {
                transform: inverse,
                inliers: pair.inliers.iter().map(|&(s, d)| (d, s)).collect(),
                confidence: pair.confidence,
            })
        }
    }

    /// Dense symmetric confidence matrix (diagonal zero).
    pub fn confidence_matrix(&self) -> Vec<Vec<f64>> {
        let mut matrix = vec![vec![0.0; self.num_images]; self.num_images];
        for pair in &self.pairs {
            matrix[pair.i][pair.j] = pair.confidence;
            matrix[pair.j][pair.i] = pair.confidence;
        }
        matrix
    }

    /// Restrict to the kept image indices (ascending), remapping pair
    /// endpoints to positions in `kept`. Applied together with the frame
    /// and feature subsets so all indexing stays aligned.
    pub fn subset(&self, kept: &[usize]) -> MatchSet {
        let mut position = vec![None; self.num_images];
        for (pos, &idx) in kept.iter().enumerate() {
            position[idx] = Some(pos);
        }
        let pairs = self
            .pairs
            .iter()
            .filter_map(|p| {
                let (Some(i), Some(j)) = (position[p.i], position[p.j]) else {
                    return None;
                };
                let mut remapped = p.clone();
                remapped.i = i;
                remapped.j = j;
                Some(remapped)
            })
            .collect();
        MatchSet {
            num_images: kept.len(),
            pairs,
        }
    }
}

/// Match every unordered image pair.
///
/// Fails with `UnreadyState` when called with no feature sets (detection has
/// not run).
pub fn match_features(features: &[FeatureSet], params: &MatcherParams) -> Result<MatchSet> {
    if features.is_empty() {
        return Err(StitchError::UnreadyState(
            "feature detection must run before matching",
        ));
    }
    let n = features.len();
    let index_pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect();

    let pairs: Vec<PairMatch> = index_pairs
        .par_iter()
        .filter_map(|&(i, j)| match_pair(i, j, &features[i], &features[j], params))
        .collect();

    // Parallel collection order is nondeterministic; restore pair order.
    let mut pairs = pairs;
    pairs.sort_by_key(|p| (p.i, p.j));
    for pair in &pairs {
        debug!(
            "pair ({}, {}): {} putative, {} inliers, confidence {:.3}",
            pair.i,
            pair.j,
            pair.num_matches,
            pair.inliers.len(),
            pair.confidence
        );
    }
    Ok(MatchSet {
        num_images: n,
        pairs,
    })
}

fn match_pair(
    i: usize,
    j: usize,
    a: &FeatureSet,
    b: &FeatureSet,
    params: &MatcherParams,
) -> Option<PairMatch> {
    let putative = mutual_matches(a, b, params);
    if putative.len() < 3 {
        return None;
    }
    let pairs: Vec<PointPair> = putative
        .iter()
        .map(|&(ia, ib)| {
            let ka = a.features[ia].keypoint;
            let kb = b.features[ib].keypoint;
            ([ka.x as f64, ka.y as f64], [kb.x as f64, kb.y as f64])
        })
        .collect();

    let seed = (i as u64) << 32 | j as u64;
    let fit = ransac::estimate_affine(&pairs, &params.ransac, seed)?;
    if fit.inliers.len() < params.min_inliers {
        return None;
    }
    // OpenCV's pairwise confidence: inliers over an affine function of the
    // putative match count.
    let confidence = fit.inliers.len() as f64 / (8.0 + 0.3 * pairs.len() as f64);
    Some(PairMatch {
        i,
        j,
        num_matches: pairs.len(),
        transform: fit.transform,
        inliers: fit.inliers,
        confidence,
    })
}

/// Mutual nearest-neighbour descriptor matching with a ratio test.
fn mutual_matches(a: &FeatureSet, b: &FeatureSet, params: &MatcherParams) -> Vec<(usize, usize)> {
    let forward = nearest_neighbours(a, b, params);
    let backward = nearest_neighbours(b, a, params);
    forward
        .into_iter()
        .filter(|&(ia, ib)| backward.iter().any(|&(jb, ja)| jb == ib && ja == ia))
        .collect()
}

fn nearest_neighbours(
    from: &FeatureSet,
    to: &FeatureSet,
    params: &MatcherParams,
) -> Vec<(usize, usize)> {
    from.features
        .iter()
        .enumerate()
        .filter_map(|(idx, feature)| {
            let mut best = u32::MAX;
            let mut second = u32::MAX;
            let mut best_idx = 0usize;
            for (cand_idx, cand) in to.features.iter().enumerate() {
                let dist = hamming(&feature.descriptor, &cand.descriptor);
                if dist < best {
                    second = best;
                    best = dist;
                    best_idx = cand_idx;
                } else if dist < second {
                    second = dist;
                }
            }
            let passes_ratio =
                second == u32::MAX || (best as f32) < params.ratio * second as f32;
            (best <= params.max_distance && passes_ratio).then_some((idx, best_idx))
        })
        .collect()
}
