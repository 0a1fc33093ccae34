//! Hub-based clustering.
//!
//! A point set is clustered by one of several algorithms ([Algorithm]); every cluster gets a
//! hub, the member closest to the cluster's centroid, and the clustering is scored by the sum of
//! squared distances of the points to their hubs. The resulting [Solution] can then be improved
//! by local search ([hill_climbing], [simulated_annealing]).
//!
//! # Example
//!
//! ```rust
//! use hub_clustering::{cluster, hill_climbing, AlgorithmParams, BuiltinBackend, PointSet, SearchParameters};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use std::sync::Arc;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(0);
//! let space = Arc::new(PointSet::new_random(100, 2, &mut rng));
//! let params = AlgorithmParams::new().with("n_clusters", 4).with("random_state", 0);
//! let solution = cluster(&BuiltinBackend::new(), "kmeans", space, &params).unwrap();
//!
//! let (best, _report) = hill_climbing(&solution, &SearchParameters::default(), &mut rng).unwrap();
//! assert!(best.objective() <= solution.objective());
//! ```

pub mod types;

mod error;
pub use error::{BackendError, HubError};

mod space;
pub use space::PointSet;

mod utilities;

mod hubs;
pub use hubs::{centroid_hubs, nearest_hub, select_hubs};

mod objective;
pub use objective::objective;

mod solution;
pub use solution::Solution;

mod clustering;
pub use clustering::{
    cluster, cluster_with, AffinityPropagation, Algorithm, AlgorithmParams, BuiltinBackend, Clusterer,
    ClusteringBackend, Dbscan, Hierarchical, KMeans, MeanShift, ParamValue, Spectral,
};

mod assertions;

pub mod neighborhood;
pub use neighborhood::{random_neighbor, Move};

mod search;
pub use search::{
    hill_climbing, hill_climbing_with_cancellation, improve, simulated_annealing,
    simulated_annealing_with_cancellation, CancellationToken, Heuristic, SearchParameters, SearchReport,
};

#[cfg(feature = "python")]
mod python_interface;
