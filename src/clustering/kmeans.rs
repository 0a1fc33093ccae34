use super::gonzales::gonzales_heuristic;
use super::{check_n_clusters, relabel, AlgorithmParams, Clusterer};
use crate::error::BackendError;
use crate::hubs::nearest_hub;
use crate::space::{squared_dist, PointSet};
use crate::types::{ClusterId, Distance, Position};

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

/// How the initial centroids are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KMeansInit {
    /// each further centroid is sampled with probability proportional to the squared distance
    /// to the centroids chosen so far
    KMeansPlusPlus,
    /// k distinct points chosen uniformly at random
    Random,
    /// Gonzales farthest-first traversal; deterministic
    FarthestFirst,
}

#[derive(Debug, Clone)]
pub(crate) struct KMeansOptions {
    pub n_clusters: usize,
    pub init: KMeansInit,
    pub max_iter: usize,
    pub tol: f64,
    pub n_init: usize,
    pub seed: Option<u64>,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        KMeansOptions {
            n_clusters: 8,
            init: KMeansInit::KMeansPlusPlus,
            max_iter: 300,
            tol: 1e-4,
            n_init: 1,
            seed: None,
        }
    }
}

impl KMeansOptions {
    fn from_params(params: &AlgorithmParams, n: usize) -> Result<KMeansOptions, BackendError> {
        params.expect_only(&["n_clusters", "init", "max_iter", "tol", "n_init", "algorithm", "random_state"])?;
        let default = KMeansOptions::default();
        let n_clusters = params.usize_or("n_clusters", default.n_clusters)?;
        check_n_clusters(n_clusters, n)?;

        let init = match params.choice_or("init", &["k-means++", "random", "farthest-first"], "k-means++")? {
            "random" => KMeansInit::Random,
            "farthest-first" => KMeansInit::FarthestFirst,
            _ => KMeansInit::KMeansPlusPlus,
        };
        // elkan only accelerates the assignment step; both variants produce lloyd's iterates
        params.choice_or("algorithm", &["lloyd", "elkan"], "lloyd")?;

        let max_iter = params.usize_or("max_iter", default.max_iter)?;
        if max_iter == 0 {
            return Err(BackendError::InvalidParameter("max_iter must be at least 1".to_string()));
        }
        let tol = params.f64_or("tol", default.tol)?;
        if tol < 0.0 {
            return Err(BackendError::InvalidParameter(format!("tol must be non-negative, got {}", tol)));
        }
        let n_init = params.usize_or("n_init", default.n_init)?;
        if n_init == 0 {
            return Err(BackendError::InvalidParameter("n_init must be at least 1".to_string()));
        }
        Ok(KMeansOptions {
            n_clusters,
            init,
            max_iter,
            tol,
            n_init,
            seed: params.opt_seed("random_state")?,
        })
    }
}

/// Result of [lloyd]: the cluster index of each point, the centroids and the inertia (sum of
/// squared distances of the points to their centroid).
#[derive(Debug, Clone)]
pub(crate) struct KMeansResult {
    pub labels: Vec<usize>,
    pub centroids: Vec<Position>,
    pub inertia: Distance,
}

/// k-means clustering ("kmeans"). Parameters: n_clusters, init, max_iter, tol, n_init,
/// algorithm, random_state.
#[derive(Debug, Clone, Copy, Default)]
pub struct KMeans;

impl Clusterer for KMeans {
    fn fit(&self, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError> {
        let options = KMeansOptions::from_params(params, space.n())?;
        let mut rng = match options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let data = space.get_positions();
        let result = lloyd(&data, &options, &mut rng);
        debug!("k-means finished with {} centroids and inertia {}", result.centroids.len(), result.inertia);
        Ok(relabel(&result.labels.into_iter().map(Some).collect::<Vec<_>>()))
    }
}

/// Lloyd's algorithm, restarted n_init times; the run with the smallest inertia is returned.
/// Requires 1 <= n_clusters <= data.len().
pub(crate) fn lloyd<R: Rng + ?Sized>(data: &[Position], options: &KMeansOptions, rng: &mut R) -> KMeansResult {
    let run = |rng: &mut R| {
        let centroids = initial_centroids(data, options.n_clusters, options.init, rng);
        lloyd_single(data, centroids, options.max_iter, options.tol)
    };
    let mut best = run(rng);
    for _ in 1..options.n_init {
        let result = run(rng);
        if result.inertia < best.inertia {
            best = result;
        }
    }
    best
}

fn lloyd_single(data: &[Position], mut centroids: Vec<Position>, max_iter: usize, tol: f64) -> KMeansResult {
    let dim = data.first().map_or(0, |x| x.len());
    let mut labels = assign(data, &centroids);

    for iteration in 0..max_iter {
        let mut sums: Vec<Position> = vec![vec![0.0; dim]; centroids.len()];
        let mut counts: Vec<usize> = vec![0; centroids.len()];
        for (x, &c) in data.iter().zip(labels.iter()) {
            for (s, v) in sums[c].iter_mut().zip(x.iter()) {
                *s += v;
            }
            counts[c] += 1;
        }

        let mut shift: Distance = 0.0;
        for (c, centroid) in centroids.iter_mut().enumerate() {
            // an empty cluster keeps its centroid
            if counts[c] == 0 {
                continue;
            }
            let new_centroid: Position = sums[c].iter().map(|s| s / counts[c] as Distance).collect();
            shift += squared_dist(centroid, &new_centroid);
            *centroid = new_centroid;
        }

        labels = assign(data, &centroids);
        if shift <= tol {
            debug!("k-means converged after {} iterations", iteration + 1);
            break;
        }
    }

    let inertia = data
        .iter()
        .zip(labels.iter())
        .map(|(x, &c)| squared_dist(x, &centroids[c]))
        .sum();
    KMeansResult { labels, centroids, inertia }
}

/// Index of the nearest centroid for every point.
fn assign(data: &[Position], centroids: &[Position]) -> Vec<usize> {
    data.par_iter()
        .map(|x| nearest_hub(x, centroids).unwrap_or(0))
        .collect()
}

fn initial_centroids<R: Rng + ?Sized>(data: &[Position], k: usize, init: KMeansInit, rng: &mut R) -> Vec<Position> {
    let indices: Vec<usize> = match init {
        KMeansInit::FarthestFirst => gonzales_heuristic(data, k),
        KMeansInit::Random => rand::seq::index::sample(rng, data.len(), k).into_vec(),
        KMeansInit::KMeansPlusPlus => {
            let mut chosen: Vec<usize> = Vec::with_capacity(k);
            chosen.push(rng.gen_range(0..data.len()));
            let mut min_dist: Vec<Distance> = data.iter().map(|x| squared_dist(x, &data[chosen[0]])).collect();
            while chosen.len() < k {
                // all weights are zero if the remaining points coincide with chosen centroids
                let next = match WeightedIndex::new(&min_dist) {
                    Ok(weights) => weights.sample(rng),
                    Err(_) => rng.gen_range(0..data.len()),
                };
                chosen.push(next);
                for (d, x) in min_dist.iter_mut().zip(data.iter()) {
                    let d_new = squared_dist(x, &data[next]);
                    if d_new < *d {
                        *d = d_new;
                    }
                }
            }
            chosen
        }
    };
    indices.into_iter().map(|i| data[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::tests::{assert_recovers_blobs, three_blobs};

    fn options(init: KMeansInit) -> KMeansOptions {
        KMeansOptions {
            n_clusters: 3,
            init,
            ..KMeansOptions::default()
        }
    }

    #[test]
    fn every_init_recovers_blobs() {
        let data = three_blobs().get_positions();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for init in [KMeansInit::KMeansPlusPlus, KMeansInit::FarthestFirst] {
            let result = lloyd(&data, &options(init), &mut rng);
            let labels: Vec<ClusterId> = result.labels.iter().map(|&l| l as ClusterId).collect();
            assert_recovers_blobs(&labels);
            assert_eq!(result.centroids.len(), 3);
        }
        // random init may start with two centroids in one blob; restarts fix that
        let random = KMeansOptions { n_init: 10, ..options(KMeansInit::Random) };
        let result = lloyd(&data, &random, &mut rng);
        let labels: Vec<ClusterId> = result.labels.iter().map(|&l| l as ClusterId).collect();
        assert_recovers_blobs(&labels);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let space = three_blobs();
        let params = AlgorithmParams::new().with("n_clusters", 5).with("random_state", 42);
        assert_eq!(KMeans.fit(&space, &params), KMeans.fit(&space, &params));
    }

    #[test]
    fn duplicate_points_do_not_break_plus_plus() {
        let data = vec![vec![1.0, 1.0]; 4];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = lloyd(&data, &KMeansOptions { n_clusters: 2, ..KMeansOptions::default() }, &mut rng);
        assert_eq!(result.inertia, 0.0);
        assert_eq!(result.labels.len(), 4);
    }

    #[test]
    fn parameter_validation() {
        let space = three_blobs();
        assert!(KMeans.fit(&space, &AlgorithmParams::new().with("n_clusters", 0)).is_err());
        assert!(KMeans.fit(&space, &AlgorithmParams::new().with("n_clusters", 3).with("init", "kmeans")).is_err());
        assert!(KMeans.fit(&space, &AlgorithmParams::new().with("n_clusters", 3).with("tol", -1.0)).is_err());
        assert!(KMeans.fit(&space, &AlgorithmParams::new().with("n_clusters", 3).with("algorithm", "elkan")).is_ok());
    }
}
