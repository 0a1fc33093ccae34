use crate::space::squared_dist;
use crate::types::{Distance, PointIdx, Position};

/// Farthest-first traversal (Gonzales heuristic for k-center): starts with the first point and
/// repeatedly adds the point farthest away from all centers chosen so far.
/// Returns k distinct point indices if there are at least k distinct positions.
pub(super) fn gonzales_heuristic(data: &[Position], k: usize) -> Vec<PointIdx> {
    let mut gonzales: Vec<PointIdx> = Vec::with_capacity(k);
    if data.is_empty() || k == 0 {
        return gonzales;
    }

    // we can add any point as first center, so lets take 0
    gonzales.push(0);

    // current distance of point x to the set of already determined centers
    let mut dist_x_center: Vec<Distance> = data.iter().map(|x| squared_dist(x, &data[0])).collect();

    for i in 1..k {
        let mut current_distance = Distance::MIN; // maximal distance to set of centers
        let mut current_point: Option<PointIdx> = None; // corresponding point with this max distance.
        let newest = &data[gonzales[i - 1]];
        for (j, x) in data.iter().enumerate() {
            // as the distance of j to the centers 0..i-2 is known, we only need to measure the
            // distance to the newest center i-1.
            let dist_to_newest_center = squared_dist(x, newest);
            if dist_to_newest_center < dist_x_center[j] {
                dist_x_center[j] = dist_to_newest_center;
            }

            if dist_x_center[j] > current_distance {
                current_distance = dist_x_center[j];
                current_point = Some(j);
            }
        }
        match current_point {
            Some(p) => gonzales.push(p),
            None => break,
        }
    }
    gonzales
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_farthest_points() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![10.0, 0.0], vec![5.0, 0.0], vec![0.0, 7.0]];
        assert_eq!(gonzales_heuristic(&data, 3), vec![0, 2, 4]);
        assert_eq!(gonzales_heuristic(&data, 0), Vec::<PointIdx>::new());
    }
}
