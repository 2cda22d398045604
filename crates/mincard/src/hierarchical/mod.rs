//! Hierarchical divisive clustering under a minimum-size constraint.
//!
//! Blocks of points are split along an approximate diameter until they drop
//! below twice the size constraint, at which point they become clusters.
//! The diameter is approximated with two farthest-point queries, and the
//! split projects every point onto the difference of its distances to the
//! two endpoints.

use crate::search::{DistanceSearch, MaxDistSearch};
use crate::{ClusterLabel, Clustering, DataSet, Error, PointIndex, Result, UNASSIGNED};

/// Clusters the whole data set so that every cluster has between
/// `size_constraint` and `2 * size_constraint - 1` members.
///
/// # Errors
///
/// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if the size constraint is zero.
/// - [`ErrorKind::NoSolution`](crate::ErrorKind::NoSolution) if the data set has fewer points than the
///   size constraint.
/// - [`ErrorKind::DistSearchError`](crate::ErrorKind::DistSearchError) when the backend rejects the data
///   set.
pub fn hierarchical_clustering(
    data: &DataSet,
    search: &dyn DistanceSearch,
    size_constraint: usize,
    batch_assign: bool,
) -> Result<Clustering<'static>> {
    let mut clustering = Clustering::new(data.num_points())?;
    let block = (0..data.num_points() as PointIndex).collect::<Vec<_>>();
    split_into(data, search, size_constraint, batch_assign, vec![block], &mut clustering)?;
    Ok(clustering)
}

/// Refines an existing clustering by splitting each of its clusters, so
/// that every refined cluster keeps at least `size_constraint` members.
/// Unassigned points stay unassigned.
///
/// The input clustering is consumed and its label storage reused; clone it
/// first to keep the original.
///
/// # Errors
///
/// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if the size constraint is zero or the
///   clustering does not cover the data set.
/// - [`ErrorKind::NoSolution`](crate::ErrorKind::NoSolution) if any existing cluster is smaller than the
///   size constraint.
/// - [`ErrorKind::DistSearchError`](crate::ErrorKind::DistSearchError) when the backend rejects the data
///   set.
pub fn refine_clustering<'a>(
    data: &DataSet,
    search: &dyn DistanceSearch,
    size_constraint: usize,
    batch_assign: bool,
    mut existing: Clustering<'a>,
) -> Result<Clustering<'a>> {
    if existing.num_points() != data.num_points() {
        return Err(Error::invalid_input(format!(
            "the clustering covers {} points but the data set has {}",
            existing.num_points(),
            data.num_points()
        )));
    }

    let mut blocks = vec![Vec::new(); existing.num_clusters()];
    for (i, &label) in existing.labels().iter().enumerate() {
        if label != UNASSIGNED {
            blocks[label as usize].push(i as PointIndex);
        }
    }

    split_into(data, search, size_constraint, batch_assign, blocks, &mut existing)?;
    Ok(existing)
}

/// Splits the given blocks and writes the resulting labels through the
/// clustering. On failure the clustering is left untouched.
fn split_into(
    data: &DataSet,
    search: &dyn DistanceSearch,
    size_constraint: usize,
    batch_assign: bool,
    blocks: Vec<Vec<PointIndex>>,
    clustering: &mut Clustering<'_>,
) -> Result<()> {
    if size_constraint == 0 {
        return Err(Error::invalid_input("the size constraint must be at least 1"));
    }
    if let Some(small) = blocks.iter().find(|b| b.len() < size_constraint) {
        return Err(Error::no_solution(format!(
            "a cluster of {} points cannot be split under the size constraint {size_constraint}",
            small.len()
        )));
    }
    if !search.check(data) {
        return Err(Error::DistSearch(
            "the distance-search backend cannot serve this data set".to_string(),
        ));
    }
    ftlog::debug!(
        "hierarchically splitting {} blocks with size constraint {size_constraint}",
        blocks.len()
    );

    // All fallible work happens against scratch labels so that the output
    // clustering stays untouched on failure. Unassigned points keep their
    // sentinel; every block member is overwritten below.
    let mut labels = clustering.labels().to_vec();
    let mut next_label: ClusterLabel = 0;

    // Depth-first through a stack of blocks; pushing the right half first
    // keeps emitted labels in left-to-right order.
    let mut stack = blocks;
    stack.reverse();
    while let Some(block) = stack.pop() {
        if block.len() < 2 * size_constraint {
            for &p in &block {
                labels[p as usize] = next_label;
            }
            next_label += 1;
            continue;
        }
        let (left, right) = split_block(data, search, size_constraint, batch_assign, &block)?;
        stack.push(right);
        stack.push(left);
    }

    clustering.labels_mut().copy_from_slice(&labels);
    clustering.set_num_clusters(next_label as usize);
    clustering.renumber();
    ftlog::debug!("split into {} clusters", clustering.num_clusters());
    Ok(())
}

/// Splits one block along its approximate diameter into two halves, each of
/// at least `size_constraint` points.
fn split_block(
    data: &DataSet,
    search: &dyn DistanceSearch,
    size_constraint: usize,
    batch_assign: bool,
    block: &[PointIndex],
) -> Result<(Vec<PointIndex>, Vec<PointIndex>)> {
    let n = block.len();
    debug_assert!(n >= 2 * size_constraint);

    // Two-round farthest-point heuristic: the endpoints of the approximate
    // diameter anchor the split.
    let mut max = search.open_max_search(data, block)?;
    let (p, _) = max.max_dist(block[0])?;
    let (q, _) = max.max_dist(p)?;

    let rows = search.distance_rows(data, &[p, q], block)?;
    let (to_p, to_q) = rows.split_at(n);

    // Points nearest the first endpoint sort first. Index ties keep the
    // split deterministic and cover the degenerate case where the block
    // has no extent at all.
    let mut order = (0..n).collect::<Vec<_>>();
    order.sort_unstable_by(|&i, &j| {
        (to_p[i] - to_q[i])
            .total_cmp(&(to_p[j] - to_q[j]))
            .then(block[i].cmp(&block[j]))
    });

    // With batch assignment the left half is padded down to a multiple of
    // the size constraint, so whole batches land on the same side.
    let mid = if batch_assign {
        size_constraint * ((n / 2) / size_constraint)
    } else {
        n / 2
    };
    debug_assert!(mid >= size_constraint && n - mid >= size_constraint);

    let left = order[..mid].iter().map(|&i| block[i]).collect();
    let right = order[mid..].iter().map(|&i| block[i]).collect();
    Ok((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::BruteForce;
    use crate::check_clustering;

    /// `count` points spaced evenly on a line.
    fn line(count: usize) -> DataSet<'static> {
        let coords = (0..count).map(|i| i as f64).collect::<Vec<_>>();
        DataSet::from_vec(coords, count, 1).unwrap_or_else(|_| unreachable!("the line data set is valid"))
    }

    /// The member counts per cluster.
    fn cluster_sizes(clustering: &Clustering) -> Vec<usize> {
        let mut sizes = vec![0; clustering.num_clusters()];
        for &label in clustering.labels() {
            if label != UNASSIGNED {
                sizes[label as usize] += 1;
            }
        }
        sizes
    }

    #[test]
    fn emitted_clusters_stay_within_the_size_window() -> Result<()> {
        let data = line(23);
        for size_constraint in [1, 2, 3, 5, 11] {
            let clustering = hierarchical_clustering(&data, &BruteForce::new(), size_constraint, false)?;
            assert!(check_clustering(&clustering, size_constraint, None, None, None));
            for size in cluster_sizes(&clustering) {
                assert!(
                    (size_constraint..2 * size_constraint).contains(&size),
                    "cluster of {size} points under size constraint {size_constraint}"
                );
            }
        }
        Ok(())
    }

    #[test]
    fn batch_assignment_splits_on_multiples() -> Result<()> {
        let data = line(24);
        let clustering = hierarchical_clustering(&data, &BruteForce::new(), 4, true)?;
        // 24 points split 12/12, then 12 splits 8/4... every split lands on
        // a multiple of 4, so every cluster has exactly 4 members.
        for size in cluster_sizes(&clustering) {
            assert_eq!(size, 4);
        }
        Ok(())
    }

    #[test]
    fn coincident_points_fall_back_to_index_order() -> Result<()> {
        let data = DataSet::from_vec(vec![1.0; 8], 8, 1)?;
        let clustering = hierarchical_clustering(&data, &BruteForce::new(), 2, false)?;
        assert_eq!(clustering.num_clusters(), 4);
        // With no extent, the projective sort degenerates to point index
        // and consecutive runs end up together.
        assert_eq!(clustering.labels(), &[0, 0, 1, 1, 2, 2, 3, 3]);
        Ok(())
    }

    #[test]
    fn refinement_splits_each_cluster_separately() -> Result<()> {
        let data = line(12);
        let labels = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1, UNASSIGNED, UNASSIGNED];
        let existing = Clustering::from_labels(labels, 2)?;

        let refined = refine_clustering(&data, &BruteForce::new(), 2, false, existing)?;
        // The 8-point cluster splits into four pairs; the 2-point cluster
        // survives as is; the unassigned points stay unassigned.
        assert_eq!(refined.num_clusters(), 5);
        assert_eq!(refined.label(10), UNASSIGNED);
        assert_eq!(refined.label(11), UNASSIGNED);
        for size in cluster_sizes(&refined) {
            assert_eq!(size, 2);
        }
        Ok(())
    }

    #[test]
    fn too_small_inputs_have_no_solution() -> Result<()> {
        let data = line(3);
        let err = hierarchical_clustering(&data, &BruteForce::new(), 4, false)
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NoSolution);

        let existing = Clustering::from_labels(vec![0, 0, 1], 2)?;
        let err = refine_clustering(&data, &BruteForce::new(), 2, false, existing)
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NoSolution);
        Ok(())
    }

    #[test]
    fn writes_through_external_buffers() -> Result<()> {
        let data = line(4);
        let mut buffer = vec![0; 4];
        {
            let existing = Clustering::from_labels(vec![0, 0, 0, 0], 1)?;
            let refined = refine_clustering(&data, &BruteForce::new(), 2, false, existing)?;
            // Transplant the refined labels into the caller's buffer.
            buffer.copy_from_slice(refined.labels());
        }
        // The first diameter endpoint is the far end of the line, so the
        // half around it is emitted first.
        assert_eq!(buffer, vec![1, 1, 0, 0]);
        Ok(())
    }
}
