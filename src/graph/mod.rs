//! Match-confidence graph and image subset selection (stage 4).
//!
//! Vertices are image indices; edges are pairs whose match confidence
//! reaches the threshold. Only the largest connected component is worth
//! stitching; everything else is pruned from every per-image collection by
//! the caller using the returned index list.

use crate::error::{Result, StitchError};
use crate::matching::MatchSet;
use std::collections::VecDeque;
use std::fmt::Write as _;

/// Undirected graph over image indices with thresholded confidence edges.
#[derive(Clone, Debug)]
pub struct MatchGraph {
    adjacency: Vec<Vec<usize>>,
}

impl MatchGraph {
    /// Build the graph from pairwise confidences; edge iff
    /// `confidence >= threshold`.
    pub fn build(matches: &MatchSet, threshold: f64) -> MatchGraph {
        let n = matches.num_images();
        let mut adjacency = vec![Vec::new(); n];
        for pair in matches.pairs() {
            if pair.confidence >= threshold {
                adjacency[pair.i].push(pair.j);
                adjacency[pair.j].push(pair.i);
            }
        }
        MatchGraph { adjacency }
    }

    pub fn num_vertices(&self) -> usize {
        self.adjacency.len()
    }

    pub fn neighbours(&self, v: usize) -> &[usize] {
        &self.adjacency[v]
    }

    /// Connected components in first-seen order; each component's vertices
    /// are ascending.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.adjacency.len();
        let mut visited = vec![false; n];
        let mut components = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            visited[start] = true;
            while let Some(v) = queue.pop_front() {
                component.push(v);
                for &next in &self.adjacency[v] {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Vertices of the largest component; ties go to the earliest one.
    pub fn largest_component(&self) -> Vec<usize> {
        let mut best: Vec<usize> = Vec::new();
        for component in self.connected_components() {
            if component.len() > best.len() {
                best = component;
            }
        }
        best
    }
}

/// Indices (ascending) of the images worth keeping for one panorama.
///
/// Fails with `UnreadyState` when the match set is empty of images, i.e.
/// matching has not run.
pub fn indices_to_keep(matches: &MatchSet, confidence_threshold: f64) -> Result<Vec<usize>> {
    if matches.num_images() == 0 {
        return Err(StitchError::UnreadyState(
            "matches must be computed before subsetting",
        ));
    }
    let graph = MatchGraph::build(matches, confidence_threshold);
    Ok(graph.largest_component())
}

/// Graphviz rendering of the thresholded confidence graph, edges labelled
/// with their confidence, for offline inspection of a stitch run.
pub fn to_dot(names: &[&str], matches: &MatchSet, threshold: f64) -> String {
    let mut out = String::from("graph matches {\n");
    for (idx, name) in names.iter().enumerate() {
        let _ = writeln!(out, "    n{idx} [label=\"{name}\"];");
    }
    for pair in matches.pairs() {
        if pair.confidence >= threshold {
            let _ = writeln!(
                out,
                "    n{} -- n{} [label=\"{:.2}\"];",
                pair.i, pair.j, pair.confidence
            );
        }
    }
    out.push_str("}\n");
    out
}
