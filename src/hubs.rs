//////////////////////////////////////////////////////////////
////////////////////// module: hubs //////////////////////////
//////////////////////////////////////////////////////////////

/// Selection of the hub of each cluster.
///
/// At construction time a hub is always a real data point: the member closest to the centroid
/// of its cluster (see [select_hubs]). The local search additionally uses plain centroids as
/// hubs for its reallocation moves ([centroid_hubs]).
use crate::error::HubError;
use crate::space::{centroid, squared_dist, PointSet};
use crate::types::{ClusterId, Distance, PointIdx, Position};

/// For each cluster id in active_ids, returns the member that is closest to the centroid of the
/// cluster, both as position and as point index. Ties are broken by the lowest point index.
/// The output follows the order of active_ids.
///
/// # Errors
///
/// [HubError::EmptyCluster] if one of the active ids has no assigned point.
pub fn select_hubs(
    space: &PointSet,
    assignment: &[ClusterId],
    active_ids: &[ClusterId],
) -> Result<(Vec<Position>, Vec<PointIdx>), HubError> {
    let mut hubs: Vec<Position> = Vec::with_capacity(active_ids.len());
    let mut hub_indices: Vec<PointIdx> = Vec::with_capacity(active_ids.len());

    for &id in active_ids {
        let members: Vec<PointIdx> = members_of(assignment, id).collect();
        let center = centroid(space, members.iter().copied()).ok_or(HubError::EmptyCluster(id))?;

        // strict comparison keeps the first (lowest index) member among equally close ones
        let mut hub = members[0];
        let mut hub_dist = squared_dist(space.position(hub), &center);
        for &x in members[1..].iter() {
            let d = squared_dist(space.position(x), &center);
            if d < hub_dist {
                hub = x;
                hub_dist = d;
            }
        }
        hubs.push(space.position(hub).to_vec());
        hub_indices.push(hub);
    }
    Ok((hubs, hub_indices))
}

/// Search-time hub policy: the hub of each cluster is the centroid of its members, which in
/// general is not a data point. Clusters without members yield None.
pub fn centroid_hubs(
    space: &PointSet,
    assignment: &[ClusterId],
    active_ids: &[ClusterId],
) -> Vec<Option<Position>> {
    active_ids
        .iter()
        .map(|&id| centroid(space, members_of(assignment, id)))
        .collect()
}

/// Returns the index (in hubs) of the hub closest to position. Ties are broken by the lowest
/// index. Returns None if there are no hubs.
pub fn nearest_hub(position: &[Distance], hubs: &[Position]) -> Option<usize> {
    let mut best: Option<(usize, Distance)> = None;
    for (i, hub) in hubs.iter().enumerate() {
        let d = squared_dist(position, hub);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Iterates over the indices of all points assigned to id.
pub(crate) fn members_of(assignment: &[ClusterId], id: ClusterId) -> impl Iterator<Item = PointIdx> + '_ {
    assignment
        .iter()
        .enumerate()
        .filter(move |&(_, &label)| label == id)
        .map(|(x, _)| x)
}
