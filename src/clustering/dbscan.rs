use super::{AlgorithmParams, Clusterer};
use crate::error::BackendError;
use crate::space::PointSet;
use crate::types::{ClusterId, PointIdx, NOISE};
use crate::utilities::pairwise_squared_distances;

use rayon::prelude::*;
use std::collections::VecDeque;
use tracing::debug;

/// Density-based clustering ("dbscan"). Parameters: eps, min_samples.
///
/// A point is a core point if at least min_samples points (itself included) lie within
/// distance eps. Clusters are the connected components of core points together with the
/// points they reach; all other points are labelled [NOISE].
#[derive(Debug, Clone, Copy, Default)]
pub struct Dbscan;

impl Clusterer for Dbscan {
    fn fit(&self, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError> {
        params.expect_only(&["eps", "min_samples"])?;
        let eps = params.f64_or("eps", 0.5)?;
        if eps <= 0.0 {
            return Err(BackendError::InvalidParameter(format!("eps must be positive, got {}", eps)));
        }
        let min_samples = params.usize_or("min_samples", 5)?;
        if min_samples == 0 {
            return Err(BackendError::InvalidParameter("min_samples must be at least 1".to_string()));
        }

        let squared_eps = eps * eps;
        let neighbors: Vec<Vec<PointIdx>> = pairwise_squared_distances(space)
            .into_par_iter()
            .map(|row| {
                row.into_iter()
                    .enumerate()
                    .filter(|&(_, d)| d <= squared_eps)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        let is_core: Vec<bool> = neighbors.iter().map(|nb| nb.len() >= min_samples).collect();

        let mut labels: Vec<ClusterId> = vec![NOISE; space.n()];
        let mut next: ClusterId = 0;
        let mut queue: VecDeque<PointIdx> = VecDeque::new();
        for start in 0..space.n() {
            if !is_core[start] || labels[start] != NOISE {
                continue;
            }
            labels[start] = next;
            queue.push_back(start);
            while let Some(x) = queue.pop_front() {
                // border points join the cluster but do not expand it
                if !is_core[x] {
                    continue;
                }
                for &y in neighbors[x].iter() {
                    if labels[y] == NOISE {
                        labels[y] = next;
                        queue.push_back(y);
                    }
                }
            }
            next += 1;
        }
        debug!(
            "dbscan found {} clusters and {} noise points",
            next,
            labels.iter().filter(|&&l| l == NOISE).count()
        );
        Ok(labels)
    }
}
