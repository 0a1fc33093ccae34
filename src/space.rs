///////////////////////////////////////////////////////////////
///////////////////// module: space ///////////////////////////
///////////////////////////////////////////////////////////////

/// Module space maintains the point set that is clustered.
///
/// A [PointSet] is an ordered collection of n points in d-dimensional euclidean space. It is
/// immutable once created; solutions share it via `Arc<PointSet>`.
///
/// The point set can be created by new (from a vector of positions), new_random or by_file.
use crate::error::HubError;
use crate::types::{Distance, PointCount, PointIdx, Position};

use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// A point set in the euclidean space of dimension dim().
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    positions: Vec<Position>,
    dim: usize,
}

impl PointSet {
    /// Creates a new point set from a vector of positions.
    ///
    /// # Errors
    ///
    /// Returns [HubError::DimensionMismatch] if the positions do not all have the same dimension
    /// and [HubError::NonFiniteCoordinate] if a coordinate is NaN or infinite.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hub_clustering::PointSet;
    /// let space = PointSet::new(vec!(vec!(0.0, 0.0), vec!(3.0, 4.0))).unwrap();
    /// assert_eq!(space.n(), 2);
    /// assert_eq!(space.dist(0, 1), 5.0);
    /// ```
    pub fn new(positions: Vec<Position>) -> Result<PointSet, HubError> {
        let dim = positions.first().map_or(0, |p| p.len());
        for (i, p) in positions.iter().enumerate() {
            if p.len() != dim {
                return Err(HubError::DimensionMismatch { point: i, expected: dim, found: p.len() });
            }
            if !p.iter().all(|v| v.is_finite()) {
                return Err(HubError::NonFiniteCoordinate(i));
            }
        }
        Ok(PointSet { positions, dim })
    }

    /// Creates a point set with n random points in the box [-100,100]^dim.
    pub fn new_random<R: Rng + ?Sized>(n: PointCount, dim: usize, rng: &mut R) -> PointSet {
        let positions: Vec<Position> = (0..n)
            .map(|_| (0..dim).map(|_| rng.gen_range(-100.0..100.0)).collect::<Position>())
            .collect();
        PointSet { positions, dim }
    }

    /// Loads a point set from a text file.
    /// Each line contains the coordinates of one point, separated by whitespace or commas. Every
    /// point needs at least two coordinates. Empty lines are skipped.
    ///
    /// Example:
    /// ```txt
    /// -8.19 -7.88
    /// -8.06 -6.58
    /// -7.3,-6.9
    /// ```
    pub fn by_file<P: AsRef<Path>>(file_path: P) -> Result<PointSet, HubError> {
        let f = BufReader::new(File::open(file_path.as_ref())?);

        let mut positions: Vec<Position> = Vec::new();
        for (line_number, line) in f.lines().enumerate() {
            let content = line?;
            let position = content
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|entry| !entry.is_empty())
                .map(|entry| entry.parse::<Distance>())
                .collect::<Result<Position, _>>()
                .map_err(|e| HubError::Parse { line: line_number + 1, message: e.to_string() })?;
            match position.len() {
                0 => continue,
                1 => {
                    return Err(HubError::Parse {
                        line: line_number + 1,
                        message: "expected at least 2 columns, found 1".to_string(),
                    })
                }
                _ => positions.push(position),
            }
        }
        let space = PointSet::new(positions)?;
        info!(
            "Loaded {} points of dimension {} from '{}'",
            space.n(),
            space.dim(),
            file_path.as_ref().display()
        );
        Ok(space)
    }

    /// Return the number of points.
    pub fn n(&self) -> PointCount {
        self.positions.len()
    }

    /// Return the dimension of the points (0 for an empty point set).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Return the position of point x.
    pub fn position(&self, x: PointIdx) -> &[Distance] {
        &self.positions[x]
    }

    /// Provides an iterator over all positions in index order.
    pub fn iter(&self) -> std::slice::Iter<Position> {
        self.positions.iter()
    }

    /// Returns the euclidean distance between the points x1 and x2.
    pub fn dist(&self, x1: PointIdx, x2: PointIdx) -> Distance {
        squared_dist(&self.positions[x1], &self.positions[x2]).sqrt()
    }

    /// Returns the squared euclidean distance between the points x1 and x2.
    pub fn squared_dist(&self, x1: PointIdx, x2: PointIdx) -> Distance {
        squared_dist(&self.positions[x1], &self.positions[x2])
    }

    /// Return a copy of all positions.
    pub fn get_positions(&self) -> Vec<Position> {
        self.positions.clone()
    }
}

/// Squared euclidean distance of two positions of the same dimension.
pub fn squared_dist(a: &[Distance], b: &[Distance]) -> Distance {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Arithmetic mean of the positions of the given points. Returns None for an empty list.
pub fn centroid<I>(space: &PointSet, members: I) -> Option<Position>
where
    I: IntoIterator<Item = PointIdx>,
{
    let mut sum: Position = vec![0.0; space.dim()];
    let mut count = 0usize;
    for x in members {
        for (s, v) in sum.iter_mut().zip(space.position(x)) {
            *s += v;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    for s in sum.iter_mut() {
        *s /= count as Distance;
    }
    Some(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::io::Write;

    #[test]
    fn dimension_mismatch_is_rejected() {
        let result = PointSet::new(vec![vec![0.0, 0.0], vec![1.0]]);
        assert!(matches!(
            result,
            Err(HubError::DimensionMismatch { point: 1, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn nan_is_rejected() {
        let result = PointSet::new(vec![vec![0.0, 0.0], vec![1.0, f64::NAN]]);
        assert!(matches!(result, Err(HubError::NonFiniteCoordinate(1))));
    }

    #[test]
    fn distances_and_centroid() {
        let space = PointSet::new(vec![vec![0.0, 0.0], vec![0.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(space.dist(0, 2), 5.0);
        assert_eq!(space.squared_dist(1, 2), 13.0);
        assert_eq!(centroid(&space, vec![0, 1]), Some(vec![0.0, 1.0]));
        assert_eq!(centroid(&space, Vec::new()), None);
    }

    #[test]
    fn random_points_lie_in_box() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let space = PointSet::new_random(50, 3, &mut rng);
        assert_eq!(space.n(), 50);
        assert_eq!(space.dim(), 3);
        assert!(space.iter().flatten().all(|&v| (-100.0..100.0).contains(&v)));
    }

    fn write_points(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("hub_clustering_{}_{}.txt", name, std::process::id()));
        let mut f = File::create(&path).unwrap();
        write!(f, "{}", content).unwrap();
        path
    }

    #[test]
    fn load_from_file() {
        let path = write_points("commas", "-8.19,-7.88\n\n1.5, 2\n");
        let space = PointSet::by_file(&path).unwrap();
        assert_eq!(space.get_positions(), vec![vec![-8.19, -7.88], vec![1.5, 2.0]]);
        std::fs::remove_file(&path).unwrap();

        let path = write_points("invalid", "1.0,2.0\n1.0,x\n");
        assert!(matches!(PointSet::by_file(&path), Err(HubError::Parse { line: 2, .. })));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_whitespace_separated_file() {
        let path = write_points("whitespace", "1.0 2.0\n3.0\t 4.0\n  \n-5 6e-1 \n");
        let space = PointSet::by_file(&path).unwrap();
        assert_eq!(space.get_positions(), vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![-5.0, 0.6]]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn single_column_file_is_rejected() {
        let path = write_points("one_column", "1.0 2.0\n3.0\n");
        assert!(matches!(PointSet::by_file(&path), Err(HubError::Parse { line: 2, .. })));
        std::fs::remove_file(&path).unwrap();
    }
}
