/// Type of the number of points in the point set.
pub type PointCount = usize;
/// Type of the index of a point in the point set (0..n-1).
pub type PointIdx = usize;
/// Type of a cluster label. Labels are chosen by the clustering backend; [NOISE] marks points
/// that do not belong to any cluster.
pub type ClusterId = i64;
/// Type of coordinates, distances and objective values.
pub type Distance = f64;
/// A position in feature space (one coordinate per dimension).
pub type Position = Vec<Distance>;

/// Label used by density-based algorithms for points that belong to no cluster.
pub const NOISE: ClusterId = -1;

pub(crate) type DurationInSec = f64;
