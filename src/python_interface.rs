use pyo3::create_exception;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::clustering::{cluster, AlgorithmParams, BuiltinBackend, ParamValue};
use crate::error::HubError;
use crate::search::{hill_climbing, simulated_annealing, SearchParameters, SearchReport};
use crate::solution::Solution;
use crate::space::PointSet;
use crate::types::{ClusterId, Distance, DurationInSec, PointIdx, Position};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Instant;

create_exception!(hub_clustering, ClusteringError, pyo3::exceptions::PyException);
create_exception!(hub_clustering, ClusteringMissingError, pyo3::exceptions::PyException);

const NOCLUSTERING: &str = "No clustering computed yet. Run fit(data, method, **params) first.";

fn to_py_err(error: HubError) -> PyErr {
    ClusteringError::new_err(error.to_string())
}

/// Converts a python value (bool, int up to u64::MAX, float or str) into an algorithm parameter.
fn to_param(key: &str, value: &PyAny) -> PyResult<ParamValue> {
    if let Ok(v) = value.extract::<bool>() {
        return Ok(ParamValue::Bool(v));
    }
    if let Ok(v) = value.extract::<i64>() {
        return Ok(ParamValue::Int(v));
    }
    if let Ok(v) = value.extract::<u64>() {
        return Ok(ParamValue::from(v));
    }
    if let Ok(v) = value.extract::<f64>() {
        return Ok(ParamValue::Float(v));
    }
    if let Ok(v) = value.extract::<String>() {
        return Ok(ParamValue::Str(v));
    }
    Err(ClusteringError::new_err(format!(
        "Parameter '{}' must be a bool, int, float or str",
        key
    )))
}

fn rng_from(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[pyclass]
pub(crate) struct HubClustering {
    backend: BuiltinBackend,

    // attributes
    solution: Option<Solution>,

    // information
    running_time: Option<DurationInSec>,
    last_report: Option<SearchReport>,
}

impl HubClustering {
    fn get_solution(&self) -> PyResult<&Solution> {
        self.solution
            .as_ref()
            .ok_or_else(|| ClusteringMissingError::new_err(NOCLUSTERING))
    }

    /// Replaces the solution by the result of a search if it is at least as good.
    fn store_search(&mut self, result: Result<(Solution, SearchReport), HubError>) -> PyResult<Distance> {
        let (best, report) = result.map_err(to_py_err)?;
        let objective = best.objective();
        self.running_time = Some(report.running_time);
        self.last_report = Some(report);
        self.solution = Some(best);
        Ok(objective)
    }
}

#[pymethods]
impl HubClustering {
    /// Optional: thread_count = #cores (number of threads used by the clustering algorithms)
    #[new]
    #[args("*", thread_count = "0")]
    fn new(thread_count: usize) -> HubClustering {
        let backend = match thread_count {
            0 => BuiltinBackend::new(),
            t => BuiltinBackend::with_thread_count(t),
        };
        HubClustering { backend, solution: None, running_time: None, last_report: None }
    }

    /// Clusters the data and computes the hubs and the objective.
    ///
    /// # Input:
    /// * 2d-Array. An array of datapoints, which are arrays of dimension-many floats;
    /// * method: one of "kmeans", "affinity", "meanshift", "spectral", "hierarchical", "dbscan";
    /// * further keyword-arguments are handed to the algorithm, e.g. n_clusters = 3.
    ///
    /// Returns the objective of the clustering.
    #[args(data, method, params = "**")]
    fn fit(&mut self, data: Vec<Position>, method: &str, params: Option<&PyDict>) -> PyResult<Distance> {
        let space = PointSet::new(data).map_err(to_py_err)?;

        let mut algorithm_params = AlgorithmParams::new();
        if let Some(dict) = params {
            for (key, value) in dict.iter() {
                let key: String = key.extract()?;
                let value = to_param(&key, value)?;
                algorithm_params.insert(&key, value);
            }
        }

        let start = Instant::now();
        let solution = cluster(&self.backend, method, Arc::new(space), &algorithm_params).map_err(to_py_err)?;
        self.running_time = Some(start.elapsed().as_secs_f64());
        self.last_report = None;
        let objective = solution.objective();
        self.solution = Some(solution);
        Ok(objective)
    }

    /// Improves the current clustering by hill climbing. Returns the new objective.
    #[args("*", iterations = "1000", seed = "None")]
    fn hill_climbing(&mut self, iterations: usize, seed: Option<u64>) -> PyResult<Distance> {
        let params = SearchParameters { iterations, ..SearchParameters::default() };
        let result = hill_climbing(self.get_solution()?, &params, &mut rng_from(seed));
        self.store_search(result)
    }

    /// Improves the current clustering by simulated annealing. Returns the new objective.
    #[args("*", iterations = "1000", initial_temp = "100.0", cooling_rate = "0.99", seed = "None")]
    fn simulated_annealing(
        &mut self,
        iterations: usize,
        initial_temp: f64,
        cooling_rate: f64,
        seed: Option<u64>,
    ) -> PyResult<Distance> {
        let params = SearchParameters { iterations, initial_temp, cooling_rate };
        let result = simulated_annealing(self.get_solution()?, &params, &mut rng_from(seed));
        self.store_search(result)
    }

    /// Returns the cluster id of each point (-1 for noise).
    #[getter]
    fn get_labels(&self) -> PyResult<Vec<ClusterId>> {
        Ok(self.get_solution()?.assignment().to_vec())
    }

    /// Returns the active cluster ids; hubs[i] belongs to cluster_ids[i].
    #[getter]
    fn get_cluster_ids(&self) -> PyResult<Vec<ClusterId>> {
        Ok(self.get_solution()?.cluster_ids().to_vec())
    }

    #[getter]
    fn get_hubs(&self) -> PyResult<Vec<Position>> {
        Ok(self.get_solution()?.hubs().to_vec())
    }

    /// Returns the point index of each hub, None if the hub is a centroid.
    #[getter]
    fn get_hub_indices(&self) -> PyResult<Vec<Option<PointIdx>>> {
        Ok(self.get_solution()?.hub_indices().to_vec())
    }

    #[getter]
    fn get_objective(&self) -> PyResult<Distance> {
        Ok(self.get_solution()?.objective())
    }

    /// Return as float specifying the running time of the last computation in sec.
    #[getter]
    fn get_running_time(&self) -> PyResult<DurationInSec> {
        self.running_time
            .ok_or_else(|| ClusteringMissingError::new_err(NOCLUSTERING))
    }

    /// Returns a summary of the last local search, None if there was none.
    #[getter]
    fn get_last_search(&self) -> Option<String> {
        self.last_report.as_ref().map(|report| report.to_string())
    }

    /// One line per cluster: its id, its hub and its members.
    fn describe(&self) -> PyResult<String> {
        Ok(self.get_solution()?.to_string())
    }
}

#[pymodule]
fn hub_clustering(py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<HubClustering>()?;
    m.add("ClusteringError", py.get_type::<ClusteringError>())?;
    m.add("ClusteringMissingError", py.get_type::<ClusteringMissingError>())?;
    Ok(())
}
