//! The batched variant of the nearest-neighbor-graph pipeline.
//!
//! Seed candidates are processed in windows, and the nearest-neighbor
//! structures only ever cover the candidates still unassigned, which bounds
//! peak memory. Clusters are formed greedily within each window; leftovers
//! fall through to the regular assignment passes.

use super::{assign, NngParams};
use crate::search::{DistanceSearch, NnSearch};
use crate::{ClusterLabel, DataSet, Error, PointIndex, Result, UNASSIGNED};

/// Runs the batched pipeline and returns the number of clusters.
pub(super) fn batch_pipeline(
    data: &DataSet,
    search: &dyn DistanceSearch,
    params: &NngParams,
    batch_size: usize,
    candidates: &[PointIndex],
    is_candidate: &[bool],
    labels: &mut [ClusterLabel],
) -> Result<usize> {
    let size_constraint = params.size_constraint;
    let mut seeds = Vec::new();
    let mut row = Vec::with_capacity(size_constraint);

    for window in candidates.chunks(batch_size) {
        // Search among the candidates still unassigned; once fewer than the
        // size constraint remain, no further cluster can form.
        let unassigned = candidates
            .iter()
            .copied()
            .filter(|&p| labels[p as usize] == UNASSIGNED)
            .collect::<Vec<_>>();
        if unassigned.len() < size_constraint {
            break;
        }
        let mut nn = search.open_nn_search(data, size_constraint, params.seed_radius, &unassigned)?;

        for &p in window {
            if labels[p as usize] != UNASSIGNED {
                continue;
            }
            let heads = nn.knn(p)?;
            if heads.len() < size_constraint {
                // Radius-starved; left to the assignment pass.
                continue;
            }
            if heads.iter().any(|&h| labels[h as usize] != UNASSIGNED) {
                // The neighborhood went stale within this window.
                continue;
            }

            row.clear();
            row.extend_from_slice(heads);
            super::ensure_self_arc(&mut row, p);
            let c = seeds.len() as ClusterLabel;
            for &h in &row {
                labels[h as usize] = c;
            }
            seeds.push(p);
        }
    }

    if seeds.is_empty() {
        return Err(Error::no_solution(
            "no point can anchor a cluster under the given constraints",
        ));
    }
    ftlog::debug!("formed {} seed clusters in batches of {batch_size}", seeds.len());

    // There is no pipeline-wide k-NN digraph to consult, so AnyNeighbor
    // falls back to the nearest labeled point within the pass radius.
    assign::assign_unassigned(
        data,
        search,
        labels,
        candidates,
        params.primary_unassigned_method,
        params.primary_radius,
        None,
        &seeds,
    )?;

    let secondary = super::secondary_points(params, is_candidate);
    assign::assign_unassigned(
        data,
        search,
        labels,
        &secondary,
        params.secondary_unassigned_method,
        params.secondary_radius,
        None,
        &seeds,
    )?;

    Ok(seeds.len())
}
