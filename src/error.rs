use thiserror::Error;

use crate::clustering::Algorithm;
use crate::types::ClusterId;

/// Errors of the clustering adapter, the hub selection and the local search.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Unknown clustering method: {0}")]
    UnknownAlgorithm(String),

    #[error("Invalid parameters for {algorithm}: {message}")]
    InvalidParameter { algorithm: Algorithm, message: String },

    #[error("Clustering with {algorithm} failed: {message}")]
    ClusteringFailed { algorithm: Algorithm, message: String },

    #[error("Cluster {0} has no assigned points, so it has no hub")]
    EmptyCluster(ClusterId),

    #[error("Cluster id {0} is listed more than once")]
    DuplicateClusterId(ClusterId),

    #[error("The noise label {0} cannot be an active cluster id")]
    NoiseClusterId(ClusterId),

    #[error("The assignment has {found} labels but the point set has {expected} points")]
    AssignmentLength { expected: usize, found: usize },

    #[error("The solution has no hubs; local search needs at least one cluster")]
    NoHubs,

    #[error("Invalid search parameters: {0}")]
    InvalidSearchParameters(String),

    #[error("Unknown heuristic method: {0}")]
    UnknownHeuristic(String),

    #[error("Point {point} has dimension {found}, expected {expected}")]
    DimensionMismatch { point: usize, expected: usize, found: usize },

    #[error("Point {0} has a coordinate that is not a finite number")]
    NonFiniteCoordinate(usize),

    #[error("Cannot parse line {line} of the point file: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [ClusteringBackend](crate::clustering::ClusteringBackend). The adapter
/// wraps them into [HubError] together with the algorithm that was asked for.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    Failed(String),
}
