use crate::space::PointSet;
use crate::types::Distance;

use rayon::prelude::*;

/// Squared euclidean distances between all pairs of points as n x n matrix.
/// Rows are computed in parallel on the current rayon pool.
pub(crate) fn pairwise_squared_distances(space: &PointSet) -> Vec<Vec<Distance>> {
    (0..space.n())
        .into_par_iter()
        .map(|i| (0..space.n()).map(|j| space.squared_dist(i, j)).collect())
        .collect()
}

/// Returns the element that would be on position pos if list was sorted.
/// The list is reordered (but not sorted) afterwards.
pub(crate) fn kth_smallest(list: &mut Vec<Distance>, pos: usize) -> Distance {
    assert!(pos < list.len(), "position {} is out of range for a list of length {}", pos, list.len());
    median_of_medians(list, pos)
}

/// Returns the median of the list (the lower one for lists of even length).
pub(crate) fn median(list: &mut Vec<Distance>) -> Distance {
    let middle = (list.len() - 1) / 2;
    kth_smallest(list, middle)
}

/// input: unsorted list; an integer pos;
/// output: the value of the element that would have pos as index if list was sorted.
/// Linear time selection: the pivot is the median of the medians of chunks of size 5.
fn median_of_medians(list: &mut Vec<Distance>, pos: usize) -> Distance {
    let mut sublist: Vec<Distance> = Vec::with_capacity(list.len() / 5 + 1);
    for chunk in list.chunks(5) {
        let mut chunk = chunk.to_vec();
        chunk.sort_by(|a, b| a.total_cmp(b));
        sublist.push(chunk[(chunk.len() - 1) / 2]); // median of the chunk
    }
    let pivot = if sublist.len() <= 5 {
        sublist.sort_by(|a, b| a.total_cmp(b));
        sublist[(sublist.len() - 1) / 2]
    } else {
        let middle = (sublist.len() - 1) / 2;
        median_of_medians(&mut sublist, middle)
    };

    let mut left: Vec<Distance> = Vec::with_capacity((list.len() * 7) / 10);
    let mut right: Vec<Distance> = Vec::with_capacity((list.len() * 7) / 10);
    let mut pivot_seen = false;
    // empties out list; one copy of the pivot is held back, further copies go to the right
    while let Some(x) = list.pop() {
        if x < pivot {
            left.push(x);
        } else if x > pivot || pivot_seen {
            right.push(x);
        } else {
            pivot_seen = true;
        }
    }

    let k = left.len();
    let result = if pos < k {
        median_of_medians(&mut left, pos)
    } else if pos > k {
        median_of_medians(&mut right, pos - k - 1)
    } else {
        pivot
    };

    list.append(&mut left);
    list.push(pivot);
    list.append(&mut right);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn median_test() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        // a list with duplicates
        let vals: Vec<Distance> = (0..50).map(|_| rng.gen_range(0..100) as Distance).collect();
        let mut list: Vec<Distance> = (0..1001).map(|_| vals[rng.gen_range(0..50)]).collect();
        let mut sorted = list.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        assert_eq!(median(&mut list), sorted[500]);
        assert_eq!(list.len(), 1001);
        for pos in [0, 1, 17, 999, 1000] {
            assert_eq!(kth_smallest(&mut list, pos), sorted[pos]);
        }
    }

    #[test]
    fn pairwise_matrix_is_symmetric() {
        let space = PointSet::new(vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![-1.0, 0.0]]).unwrap();
        let d = pairwise_squared_distances(&space);
        assert_eq!(d[0][1], 25.0);
        assert_eq!(d[1][0], 25.0);
        assert_eq!(d[2][2], 0.0);
        assert_eq!(d[1][2], 32.0);
    }
}
