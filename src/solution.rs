//////////////////////////////////////////////////////////////
//////////////////// module: solution ////////////////////////
//////////////////////////////////////////////////////////////

/// A clustering of a point set together with one hub per cluster and its objective value.
///
/// A [Solution] is an immutable value: assignment, hubs and objective are created together and
/// are never changed afterwards. Local search moves create new solutions. The point set is
/// shared between all solutions derived from it.
use crate::error::HubError;
use crate::hubs::{members_of, select_hubs};
use crate::objective::objective;
use crate::space::PointSet;
use crate::types::{ClusterId, Distance, PointCount, PointIdx, Position, NOISE};

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Solution {
    space: Arc<PointSet>,
    /// for each point the id of its cluster (or [NOISE])
    assignment: Vec<ClusterId>,
    /// the active cluster ids; hubs\[i\] and hub_indices\[i\] belong to cluster_ids\[i\]
    cluster_ids: Vec<ClusterId>,
    hubs: Vec<Position>,
    /// Some(x) if the hub is the data point x, None if it is a centroid computed during search
    hub_indices: Vec<Option<PointIdx>>,
    objective: Distance,
}

impl Solution {
    /// Assembles a solution and computes its objective. The caller guarantees that hubs and
    /// hub_indices have one entry per cluster id.
    pub(crate) fn new(
        space: Arc<PointSet>,
        assignment: Vec<ClusterId>,
        cluster_ids: Vec<ClusterId>,
        hubs: Vec<Position>,
        hub_indices: Vec<Option<PointIdx>>,
    ) -> Solution {
        debug_assert_eq!(assignment.len(), space.n());
        debug_assert_eq!(cluster_ids.len(), hubs.len());
        debug_assert_eq!(cluster_ids.len(), hub_indices.len());
        let objective = objective(&space, &assignment, &hubs, &cluster_ids);
        Solution {
            space,
            assignment,
            cluster_ids,
            hubs,
            hub_indices,
            objective,
        }
    }

    /// Creates a solution from one label per point. The active cluster ids are the distinct
    /// labels in increasing order, [NOISE] excluded; the hub of each cluster is its member
    /// closest to the centroid. If every point is noise the solution has no hubs and objective 0.
    ///
    /// # Errors
    ///
    /// [HubError::AssignmentLength] if there is not exactly one label per point.
    pub fn from_labels(space: Arc<PointSet>, labels: Vec<ClusterId>) -> Result<Solution, HubError> {
        let mut cluster_ids: Vec<ClusterId> = labels.iter().copied().filter(|&l| l != NOISE).collect();
        cluster_ids.sort_unstable();
        cluster_ids.dedup();
        Solution::with_cluster_ids(space, labels, cluster_ids)
    }

    /// Creates a solution for an assignment and an explicit list of active cluster ids.
    ///
    /// # Errors
    ///
    /// [HubError::AssignmentLength] if there is not exactly one label per point;
    /// [HubError::NoiseClusterId] or [HubError::DuplicateClusterId] if cluster_ids contains
    /// [NOISE] or an id twice;
    /// [HubError::EmptyCluster] if one of the cluster ids has no member.
    pub fn with_cluster_ids(
        space: Arc<PointSet>,
        assignment: Vec<ClusterId>,
        cluster_ids: Vec<ClusterId>,
    ) -> Result<Solution, HubError> {
        if assignment.len() != space.n() {
            return Err(HubError::AssignmentLength { expected: space.n(), found: assignment.len() });
        }
        let mut seen: BTreeSet<ClusterId> = BTreeSet::new();
        for &id in cluster_ids.iter() {
            if id == NOISE {
                return Err(HubError::NoiseClusterId(id));
            }
            if !seen.insert(id) {
                return Err(HubError::DuplicateClusterId(id));
            }
        }
        let (hubs, hub_indices) = select_hubs(&space, &assignment, &cluster_ids)?;
        let hub_indices = hub_indices.into_iter().map(Some).collect();
        Ok(Solution::new(space, assignment, cluster_ids, hubs, hub_indices))
    }

    /// Return the shared point set.
    pub fn space(&self) -> &Arc<PointSet> {
        &self.space
    }

    /// Return the number of points.
    pub fn n(&self) -> PointCount {
        self.assignment.len()
    }

    /// Return the cluster id of every point.
    pub fn assignment(&self) -> &[ClusterId] {
        &self.assignment
    }

    /// Return the active cluster ids.
    pub fn cluster_ids(&self) -> &[ClusterId] {
        &self.cluster_ids
    }

    /// Return the hub of each active cluster, in the order of cluster_ids().
    pub fn hubs(&self) -> &[Position] {
        &self.hubs
    }

    /// Return the point index of each hub, None for centroid hubs.
    pub fn hub_indices(&self) -> &[Option<PointIdx>] {
        &self.hub_indices
    }

    /// Return the objective value (sum of squared distances to the hubs).
    pub fn objective(&self) -> Distance {
        self.objective
    }

    /// Return the number of active clusters.
    pub fn number_of_clusters(&self) -> usize {
        self.cluster_ids.len()
    }

    /// Returns true if the solution has at least one hub, which local search requires.
    pub fn has_hubs(&self) -> bool {
        !self.hubs.is_empty()
    }

    /// Return the indices of all points assigned to id.
    pub fn members(&self, id: ClusterId) -> Vec<PointIdx> {
        members_of(&self.assignment, id).collect()
    }
}

/// One line per cluster in the form `Cluster <id> (hub <point>): <member>, <member>, ...`.
/// Centroid hubs are printed as `hub -`.
impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, &id) in self.cluster_ids.iter().enumerate() {
            write!(f, "Cluster {} (hub ", id)?;
            match self.hub_indices[i] {
                Some(x) => write!(f, "{}", x)?,
                None => write!(f, "-")?,
            }
            write!(f, "):")?;
            let mut members = members_of(&self.assignment, id);
            if let Some(x) = members.next() {
                write!(f, " {}", x)?;
            }
            for x in members {
                write!(f, ", {}", x)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
