use super::{relabel, AlgorithmParams, Clusterer};
use crate::error::BackendError;
use crate::hubs::nearest_hub;
use crate::space::{squared_dist, PointSet};
use crate::types::{ClusterId, Distance, Position};
use crate::utilities::{kth_smallest, pairwise_squared_distances};

use rayon::prelude::*;
use tracing::debug;

/// Fraction of the points used as neighbourhood size when the bandwidth is estimated.
const QUANTILE: f64 = 0.3;

/// Mean shift with a flat kernel ("meanshift"). Parameters: bandwidth, max_iter.
///
/// Every point is used as a seed. Each seed is moved to the mean of all points within one
/// bandwidth until it stops moving; the resulting modes are merged and every point is labelled
/// by its nearest mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanShift;

impl Clusterer for MeanShift {
    fn fit(&self, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError> {
        params.expect_only(&["bandwidth", "max_iter"])?;
        let max_iter = params.usize_or("max_iter", 300)?;
        if max_iter == 0 {
            return Err(BackendError::InvalidParameter("max_iter must be at least 1".to_string()));
        }
        let bandwidth = match params.opt_f64("bandwidth")? {
            Some(b) if b <= 0.0 => {
                return Err(BackendError::InvalidParameter(format!("bandwidth must be positive, got {}", b)))
            }
            Some(b) => b,
            None => estimate_bandwidth(space),
        };
        if space.n() == 0 {
            return Ok(Vec::new());
        }
        if bandwidth == 0.0 {
            // all points coincide
            return Ok(vec![0; space.n()]);
        }
        debug!("mean shift with bandwidth {}", bandwidth);

        let modes = find_modes(space, bandwidth, max_iter);
        let raw: Vec<Option<usize>> = space.iter().map(|x| nearest_hub(x, &modes)).collect();
        Ok(relabel(&raw))
    }
}

/// Mean over all points of the distance to the ⌈0.3·n⌉-th nearest neighbour (the point
/// itself counts as its first neighbour).
fn estimate_bandwidth(space: &PointSet) -> Distance {
    let n = space.n();
    if n == 0 {
        return 0.0;
    }
    let k = ((QUANTILE * n as f64).ceil() as usize).clamp(1, n);
    let kth_distances: Vec<Distance> = pairwise_squared_distances(space)
        .into_par_iter()
        .map(|mut row| kth_smallest(&mut row, k - 1).sqrt())
        .collect();
    kth_distances.iter().sum::<Distance>() / n as Distance
}

/// Shifts every point to its mode and merges modes closer than bandwidth; modes with more
/// points in their window are kept first.
fn find_modes(space: &PointSet, bandwidth: Distance, max_iter: usize) -> Vec<Position> {
    let squared_bandwidth = bandwidth * bandwidth;
    let stop_threshold = 1e-3 * bandwidth;

    let mut modes: Vec<(Position, usize)> = space
        .get_positions()
        .into_par_iter()
        .map(|mut mode| {
            let mut support = 0;
            for _ in 0..max_iter {
                let mut mean: Position = vec![0.0; space.dim()];
                support = 0;
                for x in space.iter().filter(|x| squared_dist(x, &mode) <= squared_bandwidth) {
                    for (m, v) in mean.iter_mut().zip(x.iter()) {
                        *m += v;
                    }
                    support += 1;
                }
                // the window contains the seed itself in the first iteration and its mean later on
                if support == 0 {
                    break;
                }
                for m in mean.iter_mut() {
                    *m /= support as Distance;
                }
                let shift = squared_dist(&mean, &mode).sqrt();
                mode = mean;
                if shift < stop_threshold {
                    break;
                }
            }
            (mode, support)
        })
        .collect();

    // stable sort: equal support keeps seed order
    modes.sort_by(|a, b| b.1.cmp(&a.1));
    let mut kept: Vec<Position> = Vec::new();
    for (mode, _) in modes {
        if kept.iter().all(|k| squared_dist(k, &mode) > squared_bandwidth) {
            kept.push(mode);
        }
    }
    debug!("mean shift found {} modes", kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::tests::{assert_recovers_blobs, three_blobs};

    #[test]
    fn recovers_blobs() {
        let labels = MeanShift.fit(&three_blobs(), &AlgorithmParams::new().with("bandwidth", 10.0)).unwrap();
        assert_recovers_blobs(&labels);
    }

    #[test]
    fn estimated_bandwidth() {
        // n = 4, so the distance to the second nearest neighbour (itself included) is used
        let space = PointSet::new(vec![vec![0.0], vec![1.0], vec![3.0], vec![6.0]]).unwrap();
        assert_eq!(estimate_bandwidth(&space), (1.0 + 1.0 + 2.0 + 3.0) / 4.0);
    }

    #[test]
    fn coinciding_points_form_one_cluster() {
        let space = PointSet::new(vec![vec![2.0, 2.0]; 5]).unwrap();
        assert_eq!(MeanShift.fit(&space, &AlgorithmParams::new()).unwrap(), vec![0; 5]);
    }

    #[test]
    fn bandwidth_must_be_positive() {
        let result = MeanShift.fit(&three_blobs(), &AlgorithmParams::new().with("bandwidth", 0.0));
        assert!(matches!(result, Err(BackendError::InvalidParameter(_))));
    }
}
