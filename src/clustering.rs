//////////////////////////////////////////////////////////////
//////////////////// module: clustering //////////////////////
//////////////////////////////////////////////////////////////

/// Turns the output of a clustering algorithm into a [Solution].
///
/// The algorithms themselves live behind the [ClusteringBackend] trait; only a label per point
/// crosses this boundary. Centroids an algorithm may produce are never used as hubs: the hubs
/// are always recomputed from the data points (see [crate::hubs::select_hubs]).
///
/// [BuiltinBackend] is the backend shipped with this crate. It implements every [Algorithm]
/// in the submodules of this module.
use crate::error::{BackendError, HubError};
use crate::solution::Solution;
use crate::space::PointSet;
use crate::types::{ClusterId, NOISE};

use rayon::ThreadPoolBuilder;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

mod params;
pub use params::{AlgorithmParams, ParamValue};

mod affinity;
mod dbscan;
mod gonzales;
mod hierarchical;
mod kmeans;
mod mean_shift;
mod spectral;

pub use affinity::AffinityPropagation;
pub use dbscan::Dbscan;
pub use hierarchical::Hierarchical;
pub use kmeans::KMeans;
pub use mean_shift::MeanShift;
pub use spectral::Spectral;

/// The clustering algorithms that can produce an initial solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// centroid-based, number of clusters given ("kmeans")
    KMeans,
    /// exemplar-based, finds the number of clusters ("affinity")
    AffinityPropagation,
    /// centroid-based mode seeking, finds the number of clusters ("meanshift")
    MeanShift,
    /// graph-based ("spectral")
    Spectral,
    /// hierarchical-agglomerative ("hierarchical")
    Hierarchical,
    /// density-based, may label points as [NOISE] ("dbscan")
    Dbscan,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::KMeans,
        Algorithm::AffinityPropagation,
        Algorithm::MeanShift,
        Algorithm::Spectral,
        Algorithm::Hierarchical,
        Algorithm::Dbscan,
    ];

    /// The name under which the algorithm is selected.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::KMeans => "kmeans",
            Algorithm::AffinityPropagation => "affinity",
            Algorithm::MeanShift => "meanshift",
            Algorithm::Spectral => "spectral",
            Algorithm::Hierarchical => "hierarchical",
            Algorithm::Dbscan => "dbscan",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Algorithm {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Algorithm, HubError> {
        Algorithm::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| HubError::UnknownAlgorithm(s.to_string()))
    }
}

/// The capability to cluster a point set: returns one label per point. Labels are arbitrary
/// cluster ids; [NOISE] marks points without cluster.
pub trait ClusteringBackend {
    fn fit(&self, algorithm: Algorithm, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError>;
}

/// A single clustering algorithm of the [BuiltinBackend].
pub trait Clusterer: Sync {
    fn fit(&self, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError>;
}

/// Runs the algorithm called algorithm_name through the backend and assembles the solution:
/// active cluster ids (noise excluded), hubs and objective.
///
/// If the algorithm labels every point as noise, the returned solution has no hubs and
/// objective 0; local search cannot be applied to it.
///
/// # Errors
///
/// * [HubError::UnknownAlgorithm] if algorithm_name is not one of the [Algorithm] names;
/// * [HubError::InvalidParameter] if the backend rejects params;
/// * [HubError::ClusteringFailed] if the backend fails otherwise or returns a wrong number of
/// labels.
pub fn cluster<B: ClusteringBackend + ?Sized>(
    backend: &B,
    algorithm_name: &str,
    space: Arc<PointSet>,
    params: &AlgorithmParams,
) -> Result<Solution, HubError> {
    let algorithm: Algorithm = algorithm_name.parse()?;
    cluster_with(backend, algorithm, space, params)
}

/// Same as [cluster] for an already parsed [Algorithm].
pub fn cluster_with<B: ClusteringBackend + ?Sized>(
    backend: &B,
    algorithm: Algorithm,
    space: Arc<PointSet>,
    params: &AlgorithmParams,
) -> Result<Solution, HubError> {
    debug!("Running {} on {} points with parameters {}", algorithm, space.n(), params);
    let labels = backend.fit(algorithm, &space, params).map_err(|e| match e {
        BackendError::InvalidParameter(message) => HubError::InvalidParameter { algorithm, message },
        BackendError::Failed(message) => HubError::ClusteringFailed { algorithm, message },
    })?;
    if labels.len() != space.n() {
        return Err(HubError::ClusteringFailed {
            algorithm,
            message: format!("expected {} labels, got {}", space.n(), labels.len()),
        });
    }

    let noise = labels.iter().filter(|&&l| l == NOISE).count();
    let solution = Solution::from_labels(space, labels)?;
    info!(
        "Clustering: {}; clusters: {}; noise points: {}; hubs: {:?}; objective: {}",
        algorithm,
        solution.number_of_clusters(),
        noise,
        solution.hub_indices().iter().flatten().collect::<Vec<_>>(),
        solution.objective()
    );
    Ok(solution)
}

/// The clustering algorithms implemented by this crate. Distance computations run on a rayon
/// thread pool with thread_count threads.
#[derive(Debug, Clone)]
pub struct BuiltinBackend {
    thread_count: usize,
}

impl BuiltinBackend {
    /// A backend using one thread per cpu.
    pub fn new() -> BuiltinBackend {
        BuiltinBackend { thread_count: num_cpus::get() }
    }

    /// A backend using thread_count threads (at least one).
    pub fn with_thread_count(thread_count: usize) -> BuiltinBackend {
        BuiltinBackend { thread_count: thread_count.max(1) }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn clusterer(algorithm: Algorithm) -> &'static dyn Clusterer {
        match algorithm {
            Algorithm::KMeans => &KMeans,
            Algorithm::AffinityPropagation => &AffinityPropagation,
            Algorithm::MeanShift => &MeanShift,
            Algorithm::Spectral => &Spectral,
            Algorithm::Hierarchical => &Hierarchical,
            Algorithm::Dbscan => &Dbscan,
        }
    }
}

impl Default for BuiltinBackend {
    fn default() -> Self {
        BuiltinBackend::new()
    }
}

impl ClusteringBackend for BuiltinBackend {
    fn fit(&self, algorithm: Algorithm, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError> {
        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(self.thread_count)
            .build()
            .map_err(|e| BackendError::Failed(format!("cannot build thread pool: {}", e)))?;
        let clusterer = BuiltinBackend::clusterer(algorithm);
        thread_pool.install(|| clusterer.fit(space, params))
    }
}

/// Renumbers raw cluster indices to 0, 1, 2, ... in order of first appearance; None becomes
/// [NOISE].
pub(crate) fn relabel(raw: &[Option<usize>]) -> Vec<ClusterId> {
    let mut new_label_of: Vec<Option<ClusterId>> = Vec::new();
    let mut next: ClusterId = 0;
    raw.iter()
        .map(|r| match *r {
            None => NOISE,
            Some(c) => {
                if c >= new_label_of.len() {
                    new_label_of.resize(c + 1, None);
                }
                *new_label_of[c].get_or_insert_with(|| {
                    next += 1;
                    next - 1
                })
            }
        })
        .collect()
}

/// Checks the number of clusters requested from an algorithm against the number of points.
pub(crate) fn check_n_clusters(n_clusters: usize, n: usize) -> Result<(), BackendError> {
    if n_clusters == 0 {
        return Err(BackendError::InvalidParameter("n_clusters must be at least 1".to_string()));
    }
    if n_clusters > n {
        return Err(BackendError::InvalidParameter(format!(
            "n_clusters = {} is larger than the number of points ({})",
            n_clusters, n
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// A backend that ignores the point set and returns fixed labels (or an error).
    pub(crate) struct FixedLabels(pub Result<Vec<ClusterId>, BackendError>);

    impl ClusteringBackend for FixedLabels {
        fn fit(&self, _algorithm: Algorithm, _space: &PointSet, _params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError> {
            self.0.clone()
        }
    }

    /// Three well separated groups of 10 points each around (0,0), (50,50) and (100,0).
    pub(crate) fn three_blobs() -> PointSet {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let centers = [(0.0, 0.0), (50.0, 50.0), (100.0, 0.0)];
        let mut positions = Vec::new();
        for (cx, cy) in centers.iter() {
            for _ in 0..10 {
                positions.push(vec![cx + rng.gen_range(-1.0..1.0), cy + rng.gen_range(-1.0..1.0)]);
            }
        }
        PointSet::new(positions).unwrap()
    }

    /// Asserts that labels put the three blobs of [three_blobs] into three different clusters.
    pub(crate) fn assert_recovers_blobs(labels: &[ClusterId]) {
        assert_eq!(labels.len(), 30);
        for blob in 0..3 {
            let label = labels[blob * 10];
            assert_ne!(label, NOISE);
            assert!(labels[blob * 10..(blob + 1) * 10].iter().all(|&l| l == label), "labels: {:?}", labels);
        }
        assert_ne!(labels[0], labels[10]);
        assert_ne!(labels[0], labels[20]);
        assert_ne!(labels[10], labels[20]);
    }

    fn square() -> Arc<PointSet> {
        Arc::new(PointSet::new(vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![10.0, 0.0], vec![10.0, 1.0]]).unwrap())
    }

    #[test]
    fn names_round_trip() {
        for algorithm in Algorithm::ALL.iter() {
            assert_eq!(algorithm.name().parse::<Algorithm>().unwrap(), *algorithm);
        }
    }

    #[test]
    fn unknown_algorithm() {
        let backend = FixedLabels(Ok(vec![0, 0, 1, 1]));
        let result = cluster(&backend, "optics", square(), &AlgorithmParams::new());
        assert!(matches!(result, Err(HubError::UnknownAlgorithm(name)) if name == "optics"));
    }

    #[test]
    fn parameter_errors_keep_algorithm_and_message() {
        let backend = FixedLabels(Err(BackendError::InvalidParameter("eps must be positive".to_string())));
        let err = cluster(&backend, "dbscan", square(), &AlgorithmParams::new()).unwrap_err();
        match &err {
            HubError::InvalidParameter { algorithm, message } => {
                assert_eq!(*algorithm, Algorithm::Dbscan);
                assert_eq!(message, "eps must be positive");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.to_string(), "Invalid parameters for dbscan: eps must be positive");

        let backend = FixedLabels(Err(BackendError::Failed("did not converge".to_string())));
        let err = cluster(&backend, "spectral", square(), &AlgorithmParams::new()).unwrap_err();
        assert!(matches!(err, HubError::ClusteringFailed { algorithm: Algorithm::Spectral, .. }));
    }

    #[test]
    fn wrong_label_count_is_a_failure() {
        let backend = FixedLabels(Ok(vec![0, 1]));
        let err = cluster(&backend, "kmeans", square(), &AlgorithmParams::new()).unwrap_err();
        assert!(matches!(err, HubError::ClusteringFailed { algorithm: Algorithm::KMeans, .. }));
    }

    #[test]
    fn labels_become_solution() {
        let backend = FixedLabels(Ok(vec![4, 4, 9, 9]));
        let sol = cluster(&backend, "hierarchical", square(), &AlgorithmParams::new()).unwrap();
        assert_eq!(sol.cluster_ids(), &[4, 9]);
        assert_eq!(sol.hub_indices(), &[Some(0), Some(2)]);
        assert_eq!(sol.objective(), 2.0);
    }

    #[test]
    fn noise_is_filtered() {
        let backend = FixedLabels(Ok(vec![0, 0, NOISE, NOISE]));
        let sol = cluster(&backend, "dbscan", square(), &AlgorithmParams::new()).unwrap();
        assert_eq!(sol.cluster_ids(), &[0]);
        assert_eq!(sol.objective(), 1.0);
    }

    #[test]
    fn all_noise_is_not_an_error() {
        let backend = FixedLabels(Ok(vec![NOISE; 4]));
        let sol = cluster(&backend, "dbscan", square(), &AlgorithmParams::new()).unwrap();
        assert!(!sol.has_hubs());
        assert_eq!(sol.objective(), 0.0);
    }

    #[test]
    fn relabel_by_first_appearance() {
        assert_eq!(relabel(&[Some(5), Some(2), None, Some(5), Some(0)]), vec![0, 1, NOISE, 0, 2]);
    }

    #[test]
    fn builtin_backend_runs_every_algorithm() {
        let space = Arc::new(three_blobs());
        let backend = BuiltinBackend::with_thread_count(2);
        let params = [
            ("kmeans", AlgorithmParams::new().with("n_clusters", 3).with("random_state", 1)),
            ("affinity", AlgorithmParams::new().with("preference", -2000.0)),
            ("meanshift", AlgorithmParams::new().with("bandwidth", 10.0)),
            ("spectral", AlgorithmParams::new().with("n_clusters", 3).with("gamma", 0.01).with("random_state", 1)),
            ("hierarchical", AlgorithmParams::new().with("n_clusters", 3)),
            ("dbscan", AlgorithmParams::new().with("eps", 5.0).with("min_samples", 3)),
        ];
        for (name, p) in params.iter() {
            let sol = cluster(&backend, name, space.clone(), p).unwrap();
            assert_recovers_blobs(sol.assignment());
            assert_eq!(sol.number_of_clusters(), 3, "{}", name);
        }
    }

    #[test]
    fn builtin_backend_reports_bad_parameters() {
        let space = Arc::new(three_blobs());
        let backend = BuiltinBackend::with_thread_count(1);
        let err = cluster(&backend, "kmeans", space.clone(), &AlgorithmParams::new().with("n_clusters", 31)).unwrap_err();
        assert!(matches!(err, HubError::InvalidParameter { algorithm: Algorithm::KMeans, .. }));
        let err = cluster(&backend, "dbscan", space, &AlgorithmParams::new().with("epsilon", 1.0)).unwrap_err();
        assert!(matches!(err, HubError::InvalidParameter { algorithm: Algorithm::Dbscan, .. }));
    }
}
