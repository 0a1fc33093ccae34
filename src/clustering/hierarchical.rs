use super::{check_n_clusters, relabel, AlgorithmParams, Clusterer};
use crate::error::BackendError;
use crate::space::PointSet;
use crate::types::{ClusterId, Distance};
use crate::utilities::pairwise_squared_distances;

use rayon::prelude::*;
use tracing::trace;

/// Linkage criterion of the agglomeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Linkage {
    /// minimal increase of the within-cluster variance
    Ward,
    /// maximal distance between members
    Complete,
    /// mean distance between members
    Average,
    /// minimal distance between members
    Single,
}

impl Linkage {
    /// Lance–Williams update: the distance between cluster k and the union of clusters i and j.
    fn update(self, d_ki: Distance, d_kj: Distance, d_ij: Distance, n_i: usize, n_j: usize, n_k: usize) -> Distance {
        match self {
            Linkage::Single => d_ki.min(d_kj),
            Linkage::Complete => d_ki.max(d_kj),
            Linkage::Average => (n_i as Distance * d_ki + n_j as Distance * d_kj) / (n_i + n_j) as Distance,
            Linkage::Ward => {
                let total = (n_i + n_j + n_k) as Distance;
                ((n_i + n_k) as Distance * d_ki + (n_j + n_k) as Distance * d_kj - n_k as Distance * d_ij) / total
            }
        }
    }
}

/// Agglomerative clustering ("hierarchical"). Parameters: n_clusters, linkage.
///
/// Starts with singletons and merges the two closest clusters until n_clusters remain. Ward
/// linkage works on squared distances, the other linkages on euclidean distances. Ties are
/// broken towards the pair with the smallest indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hierarchical;

impl Clusterer for Hierarchical {
    fn fit(&self, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError> {
        params.expect_only(&["n_clusters", "linkage"])?;
        let n_clusters = params.usize_or("n_clusters", 2)?;
        check_n_clusters(n_clusters, space.n())?;
        let linkage = match params.choice_or("linkage", &["ward", "complete", "average", "single"], "ward")? {
            "complete" => Linkage::Complete,
            "average" => Linkage::Average,
            "single" => Linkage::Single,
            _ => Linkage::Ward,
        };
        let representative = agglomerate(space, n_clusters, linkage);
        Ok(relabel(&representative.into_iter().map(Some).collect::<Vec<_>>()))
    }
}

/// Returns for every point the index of the point representing its cluster.
fn agglomerate(space: &PointSet, n_clusters: usize, linkage: Linkage) -> Vec<usize> {
    let n = space.n();
    let mut d = pairwise_squared_distances(space);
    if linkage != Linkage::Ward {
        d.iter_mut().flatten().for_each(|v| *v = v.sqrt());
    }
    let mut active: Vec<bool> = vec![true; n];
    let mut size: Vec<usize> = vec![1; n];
    let mut representative: Vec<usize> = (0..n).collect();

    for _ in n_clusters..n {
        let (i, j) = match closest_pair(&d, &active) {
            Some(pair) => pair,
            None => break,
        };
        trace!("merging clusters {} and {} at distance {}", i, j, d[i][j]);
        for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
            let merged = linkage.update(d[k][i], d[k][j], d[i][j], size[i], size[j], size[k]);
            d[i][k] = merged;
            d[k][i] = merged;
        }
        active[j] = false;
        size[i] += size[j];
        for r in representative.iter_mut().filter(|r| **r == j) {
            *r = i;
        }
    }
    representative
}

/// The active pair (i, j) with i < j and minimal distance; the smallest (i, j) among ties.
fn closest_pair(d: &[Vec<Distance>], active: &[bool]) -> Option<(usize, usize)> {
    let row_minima: Vec<Option<(Distance, usize)>> = d
        .par_iter()
        .enumerate()
        .map(|(i, row)| {
            if !active[i] {
                return None;
            }
            let mut best: Option<(Distance, usize)> = None;
            for j in (i + 1..row.len()).filter(|&j| active[j]) {
                match best {
                    Some((dist, _)) if dist <= row[j] => {}
                    _ => best = Some((row[j], j)),
                }
            }
            best
        })
        .collect();

    let mut best: Option<(Distance, usize, usize)> = None;
    for (i, row_min) in row_minima.into_iter().enumerate() {
        if let Some((dist, j)) = row_min {
            match best {
                Some((best_dist, _, _)) if best_dist <= dist => {}
                _ => best = Some((dist, i, j)),
            }
        }
    }
    best.map(|(_, i, j)| (i, j))
}
