use super::{relabel, AlgorithmParams, Clusterer};
use crate::error::BackendError;
use crate::space::PointSet;
use crate::types::{ClusterId, Distance, PointIdx, NOISE};
use crate::utilities::{median, pairwise_squared_distances};

use rayon::prelude::*;
use tracing::{debug, warn};

/// Affinity propagation ("affinity"). Parameters: damping, max_iter, convergence_iter,
/// preference.
///
/// Similarities are negative squared euclidean distances. The preference (the similarity of a
/// point to itself) controls how many exemplars emerge; it defaults to the median of all
/// similarities between distinct points.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffinityPropagation;

struct Options {
    damping: f64,
    max_iter: usize,
    convergence_iter: usize,
    preference: Option<f64>,
}

impl Options {
    fn from_params(params: &AlgorithmParams) -> Result<Options, BackendError> {
        params.expect_only(&["damping", "max_iter", "convergence_iter", "preference"])?;
        let damping = params.f64_or("damping", 0.5)?;
        if !(0.5..1.0).contains(&damping) {
            return Err(BackendError::InvalidParameter(format!("damping must be in [0.5, 1), got {}", damping)));
        }
        let max_iter = params.usize_or("max_iter", 200)?;
        let convergence_iter = params.usize_or("convergence_iter", 15)?;
        if max_iter == 0 || convergence_iter == 0 {
            return Err(BackendError::InvalidParameter(
                "max_iter and convergence_iter must be at least 1".to_string(),
            ));
        }
        Ok(Options {
            damping,
            max_iter,
            convergence_iter,
            preference: params.opt_f64("preference")?,
        })
    }
}

impl Clusterer for AffinityPropagation {
    fn fit(&self, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError> {
        let options = Options::from_params(params)?;
        let n = space.n();
        if n < 2 {
            return Ok(vec![0; n]);
        }

        let mut s: Vec<Vec<Distance>> = pairwise_squared_distances(space)
            .into_iter()
            .map(|row| row.into_iter().map(|d| -d).collect())
            .collect();
        let preference = match options.preference {
            Some(p) => p,
            None => {
                let mut off_diagonal: Vec<Distance> = (0..n)
                    .flat_map(|i| (0..n).filter(move |&k| k != i).map(move |k| (i, k)))
                    .map(|(i, k)| s[i][k])
                    .collect();
                median(&mut off_diagonal)
            }
        };
        for (i, row) in s.iter_mut().enumerate() {
            row[i] = preference;
        }
        debug!("affinity propagation with preference {}", preference);

        let exemplars = propagate(&s, &options);
        if exemplars.is_empty() {
            warn!("affinity propagation found no exemplar; every point is labelled as noise");
            return Ok(vec![NOISE; n]);
        }
        let exemplars = refine_exemplars(&s, &exemplars);
        let raw: Vec<Option<usize>> = (0..n).map(|i| Some(nearest_exemplar(&s, i, &exemplars))).collect();
        Ok(relabel(&raw))
    }
}

/// Message passing; returns the exemplars after convergence (or after max_iter iterations).
fn propagate(s: &[Vec<Distance>], options: &Options) -> Vec<PointIdx> {
    let n = s.len();
    let damping = options.damping;
    let mut r: Vec<Vec<Distance>> = vec![vec![0.0; n]; n];
    let mut a: Vec<Vec<Distance>> = vec![vec![0.0; n]; n];

    let mut exemplars: Vec<PointIdx> = Vec::new();
    let mut unchanged = 0;
    for iteration in 0..options.max_iter {
        // responsibilities: r(i,k) = s(i,k) - max_{k' != k} (a(i,k') + s(i,k'))
        r.par_iter_mut()
            .zip(a.par_iter())
            .zip(s.par_iter())
            .for_each(|((r_row, a_row), s_row)| {
                let mut first = (Distance::NEG_INFINITY, 0);
                let mut second = Distance::NEG_INFINITY;
                for (k, (a_ik, s_ik)) in a_row.iter().zip(s_row.iter()).enumerate() {
                    let v = a_ik + s_ik;
                    if v > first.0 {
                        second = first.0;
                        first = (v, k);
                    } else if v > second {
                        second = v;
                    }
                }
                for (k, (r_ik, s_ik)) in r_row.iter_mut().zip(s_row.iter()).enumerate() {
                    let competitor = if k == first.1 { second } else { first.0 };
                    *r_ik = damping * *r_ik + (1.0 - damping) * (s_ik - competitor);
                }
            });

        // availabilities: a(i,k) = min(0, r(k,k) + sum_{i' not in {i,k}} max(0, r(i',k))),
        // a(k,k) = sum_{i' != k} max(0, r(i',k))
        let column_sums: Vec<Distance> = (0..n)
            .into_par_iter()
            .map(|k| {
                (0..n)
                    .map(|i| if i == k { r[k][k] } else { r[i][k].max(0.0) })
                    .sum()
            })
            .collect();
        a.par_iter_mut().enumerate().for_each(|(i, a_row)| {
            for (k, a_ik) in a_row.iter_mut().enumerate() {
                let new = if i == k {
                    column_sums[k] - r[k][k]
                } else {
                    (column_sums[k] - r[i][k].max(0.0)).min(0.0)
                };
                *a_ik = damping * *a_ik + (1.0 - damping) * new;
            }
        });

        let current: Vec<PointIdx> = (0..n).filter(|&k| a[k][k] + r[k][k] > 0.0).collect();
        if current == exemplars {
            unchanged += 1;
            if unchanged >= options.convergence_iter && !current.is_empty() {
                debug!("affinity propagation converged after {} iterations", iteration + 1);
                return current;
            }
        } else {
            unchanged = 0;
            exemplars = current;
        }
    }
    debug!("affinity propagation stopped after {} iterations without convergence", options.max_iter);
    exemplars
}

/// The exemplar with the highest similarity to point i; exemplars are their own exemplar.
fn nearest_exemplar(s: &[Vec<Distance>], i: PointIdx, exemplars: &[PointIdx]) -> usize {
    if let Some(pos) = exemplars.iter().position(|&e| e == i) {
        return pos;
    }
    let mut best = 0;
    for (pos, &e) in exemplars.iter().enumerate() {
        if s[i][e] > s[i][exemplars[best]] {
            best = pos;
        }
    }
    best
}

/// Replaces every exemplar by the member of its cluster with the highest total similarity to
/// the other members.
fn refine_exemplars(s: &[Vec<Distance>], exemplars: &[PointIdx]) -> Vec<PointIdx> {
    let n = s.len();
    let assignment: Vec<usize> = (0..n).map(|i| nearest_exemplar(s, i, exemplars)).collect();
    let mut refined: Vec<PointIdx> = (0..exemplars.len())
        .map(|c| {
            let members: Vec<PointIdx> = (0..n).filter(|&i| assignment[i] == c).collect();
            let mut best = exemplars[c];
            let mut best_sum = Distance::NEG_INFINITY;
            for &j in members.iter() {
                let sum: Distance = members.iter().filter(|&&i| i != j).map(|&i| s[i][j]).sum();
                if sum > best_sum {
                    best_sum = sum;
                    best = j;
                }
            }
            best
        })
        .collect();
    refined.sort_unstable();
    refined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::tests::{assert_recovers_blobs, three_blobs};

    #[test]
    fn recovers_blobs() {
        let labels = AffinityPropagation
            .fit(&three_blobs(), &AlgorithmParams::new().with("preference", -2000.0))
            .unwrap();
        assert_recovers_blobs(&labels);
    }

    #[test]
    fn low_preference_merges_everything() {
        let space = PointSet::new(vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let labels = AffinityPropagation
            .fit(&space, &AlgorithmParams::new().with("preference", -10.0))
            .unwrap();
        assert_eq!(labels, vec![0, 0, 0, 0]);
    }

    #[test]
    fn single_point_is_its_own_exemplar() {
        let space = PointSet::new(vec![vec![3.0, 3.0]]).unwrap();
        assert_eq!(AffinityPropagation.fit(&space, &AlgorithmParams::new()).unwrap(), vec![0]);
    }

    #[test]
    fn damping_out_of_range() {
        let space = three_blobs();
        for damping in [0.3, 1.0] {
            let result = AffinityPropagation.fit(&space, &AlgorithmParams::new().with("damping", damping));
            assert!(matches!(result, Err(BackendError::InvalidParameter(_))));
        }
    }
}
