//////////////////////////////////////////////////////////////
/////////////////// module: neighborhood /////////////////////
//////////////////////////////////////////////////////////////

/// Neighborhood operators of the local search.
///
/// Every operator takes a [Solution] by reference and returns a new, consistent solution
/// (assignment, hubs and objective recomputed); the input is never changed. The random
/// operators draw their choices from the given rng and then call the deterministic variant
/// (`*_to` / `*_at`) with the drawn indices.
///
/// On a solution without clusters or with fewer than two points every operator returns an
/// equivalent copy.
use crate::hubs::{centroid_hubs, nearest_hub};
use crate::solution::Solution;
use crate::types::{ClusterId, PointIdx, Position, NOISE};

use rand::Rng;
use std::fmt;
use tracing::trace;

/// The three kinds of neighborhood moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    RelocateHub,
    ReallocateNode,
    SwapNodes,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::RelocateHub, Move::ReallocateNode, Move::SwapNodes];

    /// Chooses one of the moves uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Move {
        Move::ALL[rng.gen_range(0..Move::ALL.len())]
    }

    /// Applies the move with random choices to solution.
    pub fn apply<R: Rng + ?Sized>(self, solution: &Solution, rng: &mut R) -> Solution {
        match self {
            Move::RelocateHub => relocate_hub(solution, rng),
            Move::ReallocateNode => reallocate_node(solution, rng),
            Move::SwapNodes => swap_nodes(solution, rng),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Move::RelocateHub => "relocate-hub",
            Move::ReallocateNode => "reallocate-node",
            Move::SwapNodes => "swap-nodes",
        };
        write!(f, "{}", name)
    }
}

/// Applies a uniformly chosen move to solution.
pub fn random_neighbor<R: Rng + ?Sized>(solution: &Solution, rng: &mut R) -> Solution {
    Move::random(rng).apply(solution, rng)
}

fn is_trivial(solution: &Solution) -> bool {
    solution.number_of_clusters() == 0 || solution.n() < 2
}

/// Chooses an active cluster and a point uniformly at random and moves the hub of the cluster
/// to the point (see [relocate_hub_to]).
pub fn relocate_hub<R: Rng + ?Sized>(solution: &Solution, rng: &mut R) -> Solution {
    if is_trivial(solution) {
        return solution.clone();
    }
    let cluster_pos = rng.gen_range(0..solution.number_of_clusters());
    let point = rng.gen_range(0..solution.n());
    relocate_hub_to(solution, cluster_pos, point)
}

/// The hub of the cluster at position cluster_pos (in cluster_ids()) becomes the point
/// `point`, which need not be a member of that cluster. All other hubs are kept. Afterwards
/// every point (noise included) is assigned to the cluster of its nearest hub; ties go to the
/// earlier cluster. Clusters that lose all members keep their hub.
///
/// Returns a copy of solution if cluster_pos or point is out of range.
pub fn relocate_hub_to(solution: &Solution, cluster_pos: usize, point: PointIdx) -> Solution {
    if is_trivial(solution) || cluster_pos >= solution.number_of_clusters() || point >= solution.n() {
        return solution.clone();
    }
    let space = solution.space();
    let mut hubs: Vec<Position> = solution.hubs().to_vec();
    let mut hub_indices: Vec<Option<PointIdx>> = solution.hub_indices().to_vec();
    hubs[cluster_pos] = space.position(point).to_vec();
    hub_indices[cluster_pos] = Some(point);

    let cluster_ids = solution.cluster_ids();
    let assignment: Vec<ClusterId> = space
        .iter()
        .map(|x| nearest_hub(x, &hubs).map_or(NOISE, |h| cluster_ids[h]))
        .collect();

    let neighbor = Solution::new(space.clone(), assignment, cluster_ids.to_vec(), hubs, hub_indices);
    trace!(
        "relocate-hub: hub of cluster {} moved to point {}; objective {} -> {}",
        cluster_ids[cluster_pos],
        point,
        solution.objective(),
        neighbor.objective()
    );
    neighbor
}

/// Chooses a point uniformly at random and moves it to a different active cluster, also
/// chosen uniformly at random (see [reallocate_node_to]). With a single cluster only points
/// labelled as noise can move.
pub fn reallocate_node<R: Rng + ?Sized>(solution: &Solution, rng: &mut R) -> Solution {
    if is_trivial(solution) {
        return solution.clone();
    }
    let point = rng.gen_range(0..solution.n());
    let current = solution.assignment()[point];
    let candidates: Vec<ClusterId> = solution.cluster_ids().iter().copied().filter(|&id| id != current).collect();
    if candidates.is_empty() {
        return solution.clone();
    }
    let target = candidates[rng.gen_range(0..candidates.len())];
    reallocate_node_to(solution, point, target)
}

/// Assigns point to the active cluster cluster_id and recomputes all hubs as centroids (see
/// [with_centroid_hubs]).
///
/// Returns a copy of solution if point is out of range, cluster_id is not active or the point
/// already belongs to cluster_id.
pub fn reallocate_node_to(solution: &Solution, point: PointIdx, cluster_id: ClusterId) -> Solution {
    if is_trivial(solution)
        || point >= solution.n()
        || !solution.cluster_ids().contains(&cluster_id)
        || solution.assignment()[point] == cluster_id
    {
        return solution.clone();
    }
    let mut assignment = solution.assignment().to_vec();
    let previous = assignment[point];
    assignment[point] = cluster_id;

    let neighbor = with_centroid_hubs(solution, assignment);
    trace!(
        "reallocate-node: point {} moved from cluster {} to {}; objective {} -> {}",
        point,
        previous,
        cluster_id,
        solution.objective(),
        neighbor.objective()
    );
    neighbor
}

/// Chooses two distinct points uniformly at random and exchanges their clusters (see
/// [swap_nodes_at]).
pub fn swap_nodes<R: Rng + ?Sized>(solution: &Solution, rng: &mut R) -> Solution {
    if is_trivial(solution) {
        return solution.clone();
    }
    let indices = rand::seq::index::sample(rng, solution.n(), 2);
    swap_nodes_at(solution, indices.index(0), indices.index(1))
}

/// Exchanges the cluster ids of the points i and j and recomputes all hubs as centroids (see
/// [with_centroid_hubs]). Applying it twice with the same pair restores the assignment.
///
/// Returns a copy of solution if i == j or one of them is out of range.
pub fn swap_nodes_at(solution: &Solution, i: PointIdx, j: PointIdx) -> Solution {
    if is_trivial(solution) || i == j || i >= solution.n() || j >= solution.n() {
        return solution.clone();
    }
    let mut assignment = solution.assignment().to_vec();
    assignment.swap(i, j);

    let neighbor = with_centroid_hubs(solution, assignment);
    trace!(
        "swap-nodes: points {} and {} exchanged; objective {} -> {}",
        i,
        j,
        solution.objective(),
        neighbor.objective()
    );
    neighbor
}

/// Builds the solution for assignment whose hubs are the centroids of their members (hub
/// index None). A cluster without members keeps the hub of solution.
fn with_centroid_hubs(solution: &Solution, assignment: Vec<ClusterId>) -> Solution {
    let space = solution.space();
    let cluster_ids = solution.cluster_ids();
    let mut hubs: Vec<Position> = Vec::with_capacity(cluster_ids.len());
    let mut hub_indices: Vec<Option<PointIdx>> = Vec::with_capacity(cluster_ids.len());
    for (pos, centroid) in centroid_hubs(space, &assignment, cluster_ids).into_iter().enumerate() {
        match centroid {
            Some(c) => {
                hubs.push(c);
                hub_indices.push(None);
            }
            None => {
                hubs.push(solution.hubs()[pos].clone());
                hub_indices.push(solution.hub_indices()[pos]);
            }
        }
    }
    Solution::new(space.clone(), assignment, cluster_ids.to_vec(), hubs, hub_indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::objective;
    use crate::space::PointSet;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn square() -> Solution {
        let space = PointSet::new(vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![10.0, 0.0], vec![10.0, 1.0]]).unwrap();
        Solution::from_labels(Arc::new(space), vec![0, 0, 1, 1]).unwrap()
    }

    fn random_solution(seed: u64) -> Solution {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let space = PointSet::new_random(40, 2, &mut rng);
        let labels: Vec<ClusterId> = (0..40).map(|x| (x % 4) as ClusterId).collect();
        Solution::from_labels(Arc::new(space), labels).unwrap()
    }

    fn assert_consistent(sol: &Solution) {
        let expected = objective(sol.space(), sol.assignment(), sol.hubs(), sol.cluster_ids());
        assert_eq!(sol.objective(), expected);
        assert_eq!(sol.hubs().len(), sol.number_of_clusters());
        assert_eq!(sol.hub_indices().len(), sol.number_of_clusters());
        for (hub, index) in sol.hubs().iter().zip(sol.hub_indices().iter()) {
            if let Some(x) = index {
                assert_eq!(hub.as_slice(), sol.space().position(*x));
            }
        }
    }

    #[test]
    fn relocate_to_member_matches_direct_recomputation() {
        let sol = square();
        let neighbor = relocate_hub_to(&sol, 0, 1);
        assert_eq!(neighbor.hub_indices(), &[Some(1), Some(2)]);
        assert_eq!(neighbor.assignment(), &[0, 0, 1, 1]);
        // hubs (0,1) and (10,0)
        assert_eq!(neighbor.objective(), 1.0 + 1.0);
        let direct = objective(sol.space(), &[0, 0, 1, 1], &[vec![0.0, 1.0], vec![10.0, 0.0]], &[0, 1]);
        assert_eq!(neighbor.objective(), direct);
    }

    #[test]
    fn relocate_reassigns_to_nearest_hub() {
        let sol = square();
        // both hubs on the right: cluster 0 keeps (10,1), cluster 1 keeps (10,0)
        let neighbor = relocate_hub_to(&sol, 0, 3);
        assert_eq!(neighbor.assignment(), &[1, 0, 1, 0]);
        assert_eq!(neighbor.objective(), 100.0 + 100.0);
        assert_consistent(&neighbor);
    }

    #[test]
    fn relocate_assigns_noise_points() {
        let space = Arc::new(PointSet::new(vec![vec![0.0], vec![1.0], vec![5.0]]).unwrap());
        let sol = Solution::from_labels(space, vec![0, 0, NOISE]).unwrap();
        let neighbor = relocate_hub_to(&sol, 0, 1);
        assert_eq!(neighbor.assignment(), &[0, 0, 0]);
        assert_eq!(neighbor.objective(), 1.0 + 16.0);
    }

    #[test]
    fn reallocate_uses_centroids() {
        let sol = square();
        let neighbor = reallocate_node_to(&sol, 1, 1);
        assert_eq!(neighbor.assignment(), &[0, 1, 1, 1]);
        assert_eq!(neighbor.hubs()[0], vec![0.0, 0.0]);
        assert_eq!(neighbor.hub_indices(), &[None, None]);
        assert_consistent(&neighbor);
        // moving to the current cluster changes nothing
        assert_eq!(reallocate_node_to(&sol, 1, 0).assignment(), sol.assignment());
    }

    #[test]
    fn emptied_cluster_keeps_its_hub() {
        let space = Arc::new(PointSet::new(vec![vec![0.0], vec![4.0], vec![5.0]]).unwrap());
        let sol = Solution::from_labels(space, vec![0, 1, 1]).unwrap();
        let neighbor = reallocate_node_to(&sol, 0, 1);
        assert_eq!(neighbor.cluster_ids(), &[0, 1]);
        assert_eq!(neighbor.hubs()[0], vec![0.0]);
        assert_eq!(neighbor.hub_indices()[0], Some(0));
        assert_eq!(neighbor.hubs()[1], vec![3.0]);
        assert_consistent(&neighbor);
    }

    #[test]
    fn swap_twice_restores_assignment() {
        let sol = random_solution(3);
        let once = swap_nodes_at(&sol, 2, 7);
        assert_eq!(once.assignment()[2], sol.assignment()[7]);
        assert_eq!(once.assignment()[7], sol.assignment()[2]);
        let twice = swap_nodes_at(&once, 2, 7);
        assert_eq!(twice.assignment(), sol.assignment());
        assert_consistent(&once);
        assert_consistent(&twice);
    }

    #[test]
    fn random_moves_stay_consistent() {
        let sol = random_solution(11);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let mut current = sol.clone();
        for _ in 0..200 {
            current = random_neighbor(&current, &mut rng);
            assert_consistent(&current);
            assert_eq!(current.cluster_ids(), sol.cluster_ids());
        }
        // the input is never changed
        assert_eq!(sol.assignment(), random_solution(11).assignment());
    }

    #[test]
    fn trivial_solutions_are_copied() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let space = Arc::new(PointSet::new(vec![vec![1.0, 1.0]]).unwrap());
        let single = Solution::from_labels(space, vec![0]).unwrap();
        let space = Arc::new(PointSet::new(vec![vec![0.0], vec![1.0]]).unwrap());
        let no_clusters = Solution::from_labels(space, vec![NOISE, NOISE]).unwrap();
        for sol in [single, no_clusters] {
            for m in Move::ALL {
                let neighbor = m.apply(&sol, &mut rng);
                assert_eq!(neighbor.assignment(), sol.assignment());
                assert_eq!(neighbor.objective(), sol.objective());
            }
        }
    }
}
