//////////////////////////////////////////////////////////////
////////////////////// module: search ////////////////////////
//////////////////////////////////////////////////////////////

/// Local search on solutions: hill climbing and simulated annealing.
///
/// Both heuristics run for a fixed number of iterations. In each iteration one neighbor is drawn
/// by [random_neighbor]. The returned solution is the best one seen; its objective is never
/// larger than the objective of the starting solution.
///
/// All randomness comes from the rng passed in, so a seeded rng makes a run reproducible.
use crate::assertions::{assert_annealing_parameters, assert_searchable};
use crate::error::HubError;
use crate::neighborhood::random_neighbor;
use crate::solution::Solution;
use crate::types::{Distance, DurationInSec};

use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Parameters of the local search. The temperature settings are only used by simulated
/// annealing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParameters {
    pub iterations: usize,
    pub initial_temp: f64,
    /// factor applied to the temperature after every iteration
    pub cooling_rate: f64,
}

impl Default for SearchParameters {
    fn default() -> Self {
        SearchParameters {
            iterations: 1000,
            initial_temp: 100.0,
            cooling_rate: 0.99,
        }
    }
}

/// A flag to stop a running search from another thread. Clones share the flag.
///
/// # Example
///
/// ```rust
/// use hub_clustering::CancellationToken;
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Requests the search to stop. It returns the best solution found so far.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Statistics of a finished search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub heuristic: Heuristic,
    /// number of neighbors drawn
    pub iterations: usize,
    /// number of neighbors that became the current solution
    pub accepted: usize,
    /// number of times the best solution was replaced
    pub improvements: usize,
    pub initial_objective: Distance,
    pub final_objective: Distance,
    /// temperature after the last iteration (None for hill climbing)
    pub final_temp: Option<f64>,
    pub cancelled: bool,
    pub running_time: DurationInSec,
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} iterations, {} accepted, {} improvements, objective {} -> {}",
            self.heuristic, self.iterations, self.accepted, self.improvements, self.initial_objective, self.final_objective
        )?;
        if let Some(temp) = self.final_temp {
            write!(f, ", final temperature {}", temp)?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        write!(f, ", {:.3}s", self.running_time)
    }
}

/// The local search heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// "hill"
    HillClimbing,
    /// "annealing"
    SimulatedAnnealing,
}

impl Heuristic {
    pub fn name(&self) -> &'static str {
        match self {
            Heuristic::HillClimbing => "hill",
            Heuristic::SimulatedAnnealing => "annealing",
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Heuristic {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Heuristic, HubError> {
        match s {
            "hill" => Ok(Heuristic::HillClimbing),
            "annealing" => Ok(Heuristic::SimulatedAnnealing),
            _ => Err(HubError::UnknownHeuristic(s.to_string())),
        }
    }
}

/// Runs heuristic on init.
///
/// # Errors
/// See [hill_climbing] and [simulated_annealing].
pub fn improve<R: Rng + ?Sized>(
    heuristic: Heuristic,
    init: &Solution,
    params: &SearchParameters,
    rng: &mut R,
) -> Result<(Solution, SearchReport), HubError> {
    match heuristic {
        Heuristic::HillClimbing => hill_climbing(init, params, rng),
        Heuristic::SimulatedAnnealing => simulated_annealing(init, params, rng),
    }
}

/// Hill climbing: in every iteration a neighbor of the best solution is drawn and replaces it
/// if its objective is strictly smaller. Only params.iterations is used.
///
/// # Errors
/// [HubError::NoHubs] if init has no hubs.
pub fn hill_climbing<R: Rng + ?Sized>(
    init: &Solution,
    params: &SearchParameters,
    rng: &mut R,
) -> Result<(Solution, SearchReport), HubError> {
    hill_climbing_with_cancellation(init, params, rng, &CancellationToken::new())
}

/// [hill_climbing] that stops early once token is cancelled.
pub fn hill_climbing_with_cancellation<R: Rng + ?Sized>(
    init: &Solution,
    params: &SearchParameters,
    rng: &mut R,
    token: &CancellationToken,
) -> Result<(Solution, SearchReport), HubError> {
    assert_searchable(init)?;
    let start = Instant::now();

    let mut best = init.clone();
    let mut iterations = 0;
    let mut improvements = 0;
    let mut cancelled = false;
    for i in 0..params.iterations {
        if token.is_cancelled() {
            cancelled = true;
            break;
        }
        let neighbor = random_neighbor(&best, rng);
        if neighbor.objective() < best.objective() {
            debug!("hill climbing: new best objective {} in iteration {}", neighbor.objective(), i);
            best = neighbor;
            improvements += 1;
        }
        iterations += 1;
    }

    let report = SearchReport {
        heuristic: Heuristic::HillClimbing,
        iterations,
        accepted: improvements,
        improvements,
        initial_objective: init.objective(),
        final_objective: best.objective(),
        final_temp: None,
        cancelled,
        running_time: start.elapsed().as_secs_f64(),
    };
    info!("{}", report);
    Ok((best, report))
}

/// Simulated annealing: in every iteration a neighbor of the current solution is drawn. It is
/// accepted if it is better, otherwise with probability exp(-delta / temp) where delta is the
/// increase of the objective. The temperature starts at params.initial_temp and is multiplied
/// by params.cooling_rate after every iteration. Returns the best solution seen.
///
/// # Errors
/// * [HubError::NoHubs] if init has no hubs;
/// * [HubError::InvalidSearchParameters] if initial_temp is not positive or cooling_rate is
/// not in (0, 1).
pub fn simulated_annealing<R: Rng + ?Sized>(
    init: &Solution,
    params: &SearchParameters,
    rng: &mut R,
) -> Result<(Solution, SearchReport), HubError> {
    simulated_annealing_with_cancellation(init, params, rng, &CancellationToken::new())
}

/// [simulated_annealing] that stops early once token is cancelled.
pub fn simulated_annealing_with_cancellation<R: Rng + ?Sized>(
    init: &Solution,
    params: &SearchParameters,
    rng: &mut R,
    token: &CancellationToken,
) -> Result<(Solution, SearchReport), HubError> {
    assert_searchable(init)?;
    assert_annealing_parameters(params)?;
    let start = Instant::now();

    let mut current = init.clone();
    let mut best = init.clone();
    let mut temp = params.initial_temp;
    let mut iterations = 0;
    let mut accepted = 0;
    let mut improvements = 0;
    let mut cancelled = false;
    for i in 0..params.iterations {
        if token.is_cancelled() {
            cancelled = true;
            break;
        }
        let neighbor = random_neighbor(&current, rng);
        let delta = neighbor.objective() - current.objective();
        if accept(delta, temp, rng) {
            current = neighbor;
            accepted += 1;
            if current.objective() < best.objective() {
                debug!(
                    "simulated annealing: new best objective {} in iteration {} (temperature {})",
                    current.objective(),
                    i,
                    temp
                );
                best = current.clone();
                improvements += 1;
            }
        }
        temp *= params.cooling_rate;
        iterations += 1;
    }

    let report = SearchReport {
        heuristic: Heuristic::SimulatedAnnealing,
        iterations,
        accepted,
        improvements,
        initial_objective: init.objective(),
        final_objective: best.objective(),
        final_temp: Some(temp),
        cancelled,
        running_time: start.elapsed().as_secs_f64(),
    };
    info!("{}", report);
    Ok((best, report))
}

/// Metropolis criterion. Once the temperature has decayed to 0 only improvements are accepted.
fn accept<R: Rng + ?Sized>(delta: Distance, temp: f64, rng: &mut R) -> bool {
    if delta < 0.0 {
        return true;
    }
    if !(temp > 0.0 && temp.is_finite()) {
        return false;
    }
    rng.gen::<f64>() < (-delta / temp).exp()
}
