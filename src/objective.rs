use crate::hubs::members_of;
use crate::space::{squared_dist, PointSet};
use crate::types::{ClusterId, Distance, Position};

/// Total intra-cluster dispersion: the sum of the squared euclidean distances of every point to
/// the hub of its cluster. hubs\[i\] is the hub of active_ids\[i\]; points labelled with an id
/// that is not active (e.g. noise) do not contribute.
///
/// Clusters are summed in the order of active_ids and points in index order, so the result is
/// reproducible bit for bit.
pub fn objective(
    space: &PointSet,
    assignment: &[ClusterId],
    hubs: &[Position],
    active_ids: &[ClusterId],
) -> Distance {
    let mut total: Distance = 0.0;
    for (&id, hub) in active_ids.iter().zip(hubs.iter()) {
        for x in members_of(assignment, id) {
            total += squared_dist(space.position(x), hub);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hubs::select_hubs;
    use crate::types::NOISE;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn two_pairs() {
        let space = PointSet::new(vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![10.0, 0.0], vec![10.0, 1.0]]).unwrap();
        let assignment = [0, 0, 1, 1];
        let (hubs, hub_indices) = select_hubs(&space, &assignment, &[0, 1]).unwrap();
        assert_eq!(hub_indices, vec![0, 2]);
        assert_eq!(objective(&space, &assignment, &hubs, &[0, 1]), 2.0);
    }

    #[test]
    fn noise_does_not_count() {
        let space = PointSet::new(vec![vec![0.0], vec![1.0], vec![100.0]]).unwrap();
        let assignment = [0, 0, NOISE];
        assert_eq!(objective(&space, &assignment, &[vec![0.0]], &[0]), 1.0);
    }

    #[test]
    fn zero_iff_points_coincide_with_hubs() {
        let space = PointSet::new(vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![4.0, 2.0]]).unwrap();
        let assignment = [0, 0, 1];
        let hubs = vec![vec![1.0, 1.0], vec![4.0, 2.0]];
        assert_eq!(objective(&space, &assignment, &hubs, &[0, 1]), 0.0);

        let moved = vec![vec![1.0, 1.0], vec![4.0, 2.5]];
        assert!(objective(&space, &assignment, &moved, &[0, 1]) > 0.0);
    }

    #[test]
    fn random_partitions_are_non_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let space = PointSet::new_random(40, 2, &mut rng);
            let assignment: Vec<ClusterId> = (0..40).map(|x| if x < 4 { x } else { rng.gen_range(0..4) }).collect();
            let (hubs, _) = select_hubs(&space, &assignment, &[0, 1, 2, 3]).unwrap();
            assert!(objective(&space, &assignment, &hubs, &[0, 1, 2, 3]) >= 0.0);
        }
    }
}
