extern crate hub_clustering;

use hub_clustering::{
    cluster, hill_climbing, simulated_annealing, AlgorithmParams, BuiltinBackend, HubError, PointSet, SearchParameters,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const SEED: u64 = 2022;
const VERBOSE: u8 = 1; // 0: warnings only, 1: brief, 2: verbose

fn main() {
    let level = match VERBOSE {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Cannot install the logger. Reason: {}", error);
    }

    if let Err(error) = run(std::env::args().nth(1)) {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

/// Clusters the points of file_path (or 500 random points in the plane) with k-means and
/// improves the result by both local search heuristics.
fn run(file_path: Option<String>) -> Result<(), HubError> {
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);

    let space = match file_path {
        Some(path) => PointSet::by_file(path)?,
        None => PointSet::new_random(500, 2, &mut rng),
    };
    let space = Arc::new(space);

    let params = AlgorithmParams::new().with("n_clusters", 6).with("random_state", SEED);
    let solution = cluster(&BuiltinBackend::new(), "kmeans", space, &params)?;
    println!("Initial clustering (objective {}):\n{}", solution.objective(), solution);

    let search = SearchParameters::default();
    let (hill, hill_report) = hill_climbing(&solution, &search, &mut rng)?;
    println!("{}", hill_report);

    let (annealed, annealing_report) = simulated_annealing(&solution, &search, &mut rng)?;
    println!("{}", annealing_report);

    let best = if annealed.objective() < hill.objective() { annealed } else { hill };
    println!("Best clustering (objective {}):\n{}", best.objective(), best);
    Ok(())
}
