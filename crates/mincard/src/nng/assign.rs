//! Assignment of points that remain unlabeled after seed clusters form.

use crate::graph::Digraph;
use crate::search::{DistanceSearch, NnSearch};
use crate::utils::DistItem;
use crate::{ClusterLabel, DataSet, PointIndex, Result, UNASSIGNED};

/// How points outside the seed clusters are assigned.
///
/// The discriminants are stable codes shared with language bindings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[repr(i32)]
pub enum UnassignedMethod {
    /// Leave the point unassigned.
    Ignore = 0,
    /// Assign to the cluster of any already-labeled neighbor, preferring
    /// the neighbor with the smallest point index.
    AnyNeighbor = 1,
    /// Assign to the cluster of the nearest labeled point.
    ClosestAssigned = 2,
    /// Assign to the cluster whose seed is nearest.
    ClosestSeed = 3,
    /// As [`UnassignedMethod::ClosestSeed`], but only when the seed lies
    /// within the pass radius; otherwise the point stays unassigned.
    ClosestSeedRadius = 4,
}

impl UnassignedMethod {
    /// The stable integer code of this method.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Looks a method up by its stable integer code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ignore),
            1 => Some(Self::AnyNeighbor),
            2 => Some(Self::ClosestAssigned),
            3 => Some(Self::ClosestSeed),
            4 => Some(Self::ClosestSeedRadius),
            _ => None,
        }
    }
}

/// Runs one assignment pass over `targets`, writing labels for the points
/// it can place and leaving the rest at [`UNASSIGNED`].
///
/// Points already labeled when the pass starts are the only assignment
/// targets considered as cluster donors: assignments made within a pass do
/// not cascade, so the result does not depend on the order of `targets`.
///
/// `nng` supplies the adjacency for [`UnassignedMethod::AnyNeighbor`];
/// points without adjacency (secondary points, or candidates the typed
/// build skipped) fall back to the nearest labeled point within `radius`.
/// Returns the number of points assigned.
pub(crate) fn assign_unassigned(
    data: &DataSet,
    search: &dyn DistanceSearch,
    labels: &mut [ClusterLabel],
    targets: &[PointIndex],
    method: UnassignedMethod,
    radius: Option<f64>,
    nng: Option<&Digraph>,
    seeds: &[PointIndex],
) -> Result<usize> {
    if method == UnassignedMethod::Ignore || targets.is_empty() {
        return Ok(0);
    }

    // Snapshot the labels present when the pass starts.
    let assigned = (0..labels.len())
        .filter(|&p| labels[p] != UNASSIGNED)
        .map(|p| p as PointIndex)
        .collect::<Vec<_>>();
    if assigned.is_empty() {
        return Ok(0);
    }
    let snapshot = labels.to_vec();

    let mut num_assigned = 0;
    match method {
        UnassignedMethod::Ignore => {}
        UnassignedMethod::AnyNeighbor => {
            let mut fallback = None;
            for &p in targets {
                if labels[p as usize] != UNASSIGNED {
                    continue;
                }

                let adjacency = nng.map_or(&[] as &[PointIndex], |g| g.out_neighbors(p));
                let label = if adjacency.is_empty() {
                    // No adjacency to consult; take the nearest labeled
                    // point within the pass radius.
                    if fallback.is_none() {
                        fallback = Some(search.open_nn_search(data, 1, radius, &assigned)?);
                    }
                    match fallback.as_mut() {
                        Some(nn) => nn.knn(p)?.first().map(|&u| snapshot[u as usize]),
                        None => None,
                    }
                } else {
                    adjacency
                        .iter()
                        .filter(|&&u| snapshot[u as usize] != UNASSIGNED)
                        .min()
                        .map(|&u| snapshot[u as usize])
                };
                if let Some(label) = label {
                    labels[p as usize] = label;
                    num_assigned += 1;
                }
            }
        }
        UnassignedMethod::ClosestAssigned => {
            for &p in targets {
                if labels[p as usize] != UNASSIGNED {
                    continue;
                }
                let nearest = assigned
                    .iter()
                    .map(|&u| DistItem(data.distance(p, u), u))
                    .min()
                    .map(|DistItem(_, u)| u);
                if let Some(u) = nearest {
                    labels[p as usize] = snapshot[u as usize];
                    num_assigned += 1;
                }
            }
        }
        UnassignedMethod::ClosestSeed | UnassignedMethod::ClosestSeedRadius => {
            if seeds.is_empty() {
                return Ok(0);
            }
            let radius = if method == UnassignedMethod::ClosestSeedRadius {
                radius
            } else {
                None
            };
            let mut nn = search.open_nn_search(data, 1, radius, seeds)?;
            for &p in targets {
                if labels[p as usize] != UNASSIGNED {
                    continue;
                }
                if let Some(&s) = nn.knn(p)?.first() {
                    labels[p as usize] = snapshot[s as usize];
                    num_assigned += 1;
                }
            }
        }
    }

    ftlog::debug!("assigned {num_assigned} of {} points with {method:?}", targets.len());
    Ok(num_assigned)
}
