//! Clustering validation and per-cluster distance statistics.

use crate::search::DistanceSearch;
use crate::utils::mean;
use crate::{Clustering, DataSet, Error, PointIndex, Result, TypeLabel, UNASSIGNED};

/// Checks a clustering against the engine's constraints: labels in range,
/// every populated cluster at least `size_constraint` members (and at least
/// the per-type minimums when given), and every primary point assigned.
#[must_use]
pub fn check_clustering(
    clustering: &Clustering,
    size_constraint: usize,
    type_labels: Option<&[TypeLabel]>,
    type_minimums: Option<&[u32]>,
    primary_points: Option<&[PointIndex]>,
) -> bool {
    let num_clusters = clustering.num_clusters();
    let labels = clustering.labels();

    let mut sizes = vec![0_usize; num_clusters];
    for &label in labels {
        if label == UNASSIGNED {
            continue;
        }
        if label < 0 || (label as usize) >= num_clusters {
            return false;
        }
        sizes[label as usize] += 1;
    }
    if sizes.iter().any(|&size| size > 0 && size < size_constraint) {
        return false;
    }

    match (type_labels, type_minimums) {
        (None, None) => {}
        (Some(type_labels), Some(minimums)) => {
            if type_labels.len() != labels.len() {
                return false;
            }
            let mut counts = vec![0_u32; num_clusters * minimums.len()];
            for (i, &label) in labels.iter().enumerate() {
                if label == UNASSIGNED {
                    continue;
                }
                let t = type_labels[i] as usize;
                if t >= minimums.len() {
                    return false;
                }
                counts[(label as usize) * minimums.len() + t] += 1;
            }
            for (c, &size) in sizes.iter().enumerate() {
                if size == 0 {
                    continue;
                }
                let row = &counts[c * minimums.len()..(c + 1) * minimums.len()];
                if row.iter().zip(minimums).any(|(&have, &need)| have < need) {
                    return false;
                }
            }
        }
        _ => return false,
    }

    if let Some(primary) = primary_points {
        if primary
            .iter()
            .any(|&p| (p as usize) >= labels.len() || labels[p as usize] == UNASSIGNED)
        {
            return false;
        }
    }

    true
}

/// Summary statistics of a clustering over a data set.
///
/// Distances are intra-cluster unless stated otherwise; the between-cluster
/// figure compares cluster centroids.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ClusteringStats {
    /// The number of clusters with at least one member.
    pub num_populated_clusters: usize,
    /// The number of points in some cluster.
    pub num_assigned: usize,
    /// The number of unassigned points.
    pub num_unassigned: usize,
    /// The fewest members of any populated cluster.
    pub min_cluster_size: usize,
    /// The most members of any populated cluster.
    pub max_cluster_size: usize,
    /// The mean number of members over the populated clusters.
    pub avg_cluster_size: f64,
    /// The sum of all intra-cluster pairwise distances.
    pub sum_dists: f64,
    /// The smallest intra-cluster pairwise distance.
    pub min_dist: f64,
    /// The largest intra-cluster pairwise distance.
    pub max_dist: f64,
    /// The mean over clusters of their smallest pairwise distance.
    pub avg_min_dist: f64,
    /// The mean over clusters of their largest pairwise distance.
    pub avg_max_dist: f64,
    /// The mean over clusters of their mean pairwise distance.
    pub avg_dist_within: f64,
    /// The mean centroid distance over all pairs of populated clusters.
    pub avg_dist_between: f64,
}

/// Computes [`ClusteringStats`] by enumerating intra-cluster distances
/// through the distance-search backend.
///
/// Clusters with a single member contribute zero to the distance figures.
///
/// # Errors
///
/// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if the clustering does not cover the
///   data set.
pub fn clustering_stats(data: &DataSet, search: &dyn DistanceSearch, clustering: &Clustering) -> Result<ClusteringStats> {
    if clustering.num_points() != data.num_points() {
        return Err(Error::invalid_input(format!(
            "the clustering covers {} points but the data set has {}",
            clustering.num_points(),
            data.num_points()
        )));
    }

    let mut members = vec![Vec::new(); clustering.num_clusters()];
    for (i, &label) in clustering.labels().iter().enumerate() {
        if label != UNASSIGNED {
            members[label as usize].push(i as PointIndex);
        }
    }
    let populated = members
        .iter()
        .filter(|m| !m.is_empty())
        .map(Vec::as_slice)
        .collect::<Vec<_>>();

    let num_assigned = populated.iter().map(|m| m.len()).sum::<usize>();
    #[allow(clippy::cast_precision_loss)]
    let avg_cluster_size = if populated.is_empty() {
        0.0
    } else {
        num_assigned as f64 / populated.len() as f64
    };
    let mut stats = ClusteringStats {
        num_populated_clusters: populated.len(),
        num_assigned,
        num_unassigned: clustering.num_points() - num_assigned,
        min_cluster_size: populated.iter().map(|m| m.len()).min().unwrap_or(0),
        max_cluster_size: populated.iter().map(|m| m.len()).max().unwrap_or(0),
        avg_cluster_size,
        sum_dists: 0.0,
        min_dist: 0.0,
        max_dist: 0.0,
        avg_min_dist: 0.0,
        avg_max_dist: 0.0,
        avg_dist_within: 0.0,
        avg_dist_between: 0.0,
    };
    if populated.is_empty() {
        return Ok(stats);
    }

    // One distance matrix per cluster; the per-pair figures only see the
    // upper triangle.
    let mut cluster_mins = Vec::with_capacity(populated.len());
    let mut cluster_maxs = Vec::with_capacity(populated.len());
    let mut cluster_means = Vec::with_capacity(populated.len());
    let mut global_min = f64::INFINITY;
    let mut global_max = f64::NEG_INFINITY;
    let mut any_pair = false;
    for cluster in &populated {
        let size = cluster.len();
        if size < 2 {
            cluster_mins.push(0.0);
            cluster_maxs.push(0.0);
            cluster_means.push(0.0);
            continue;
        }
        any_pair = true;

        let matrix = search.distance_matrix(data, cluster)?;
        let mut local_min = f64::INFINITY;
        let mut local_max = f64::NEG_INFINITY;
        let mut local_sum = 0.0;
        for i in 0..size {
            for j in (i + 1)..size {
                let d = matrix[i * size + j];
                local_min = local_min.min(d);
                local_max = local_max.max(d);
                local_sum += d;
            }
        }
        let num_pairs = size * (size - 1) / 2;

        stats.sum_dists += local_sum;
        global_min = global_min.min(local_min);
        global_max = global_max.max(local_max);
        cluster_mins.push(local_min);
        cluster_maxs.push(local_max);
        #[allow(clippy::cast_precision_loss)]
        cluster_means.push(local_sum / num_pairs as f64);
    }
    if any_pair {
        stats.min_dist = global_min;
        stats.max_dist = global_max;
    }
    stats.avg_min_dist = mean(&cluster_mins);
    stats.avg_max_dist = mean(&cluster_maxs);
    stats.avg_dist_within = mean(&cluster_means);

    // Between-cluster distances compare centroids.
    let centroids = populated
        .iter()
        .map(|cluster| centroid(data, cluster))
        .collect::<Vec<_>>();
    let mut between = Vec::with_capacity(centroids.len() * (centroids.len() - 1) / 2);
    for i in 0..centroids.len() {
        for j in (i + 1)..centroids.len() {
            between.push(distances::vectors::euclidean(&centroids[i], &centroids[j]));
        }
    }
    stats.avg_dist_between = mean(&between);

    Ok(stats)
}

/// The coordinate-wise mean of the cluster members.
fn centroid(data: &DataSet, members: &[PointIndex]) -> Vec<f64> {
    let mut center = vec![0.0; data.num_dims()];
    for &p in members {
        for (c, &x) in center.iter_mut().zip(data.point(p)) {
            *c += x;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let count = members.len() as f64;
    for c in &mut center {
        *c /= count;
    }
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::BruteForce;
    use float_cmp::approx_eq;

    #[test]
    fn collinear_pairs() -> Result<()> {
        // Two pair clusters on a line, with hand-computed figures.
        let data = DataSet::from_vec(vec![0.0, 1.0, 5.0, 6.0], 4, 1)?;
        let clustering = Clustering::from_labels(vec![0, 0, 1, 1], 2)?;

        let stats = clustering_stats(&data, &BruteForce::new(), &clustering)?;
        assert_eq!(stats.num_populated_clusters, 2);
        assert_eq!(stats.num_assigned, 4);
        assert_eq!(stats.num_unassigned, 0);
        assert_eq!((stats.min_cluster_size, stats.max_cluster_size), (2, 2));
        assert!(approx_eq!(f64, stats.avg_cluster_size, 2.0));
        assert!(approx_eq!(f64, stats.sum_dists, 2.0));
        assert!(approx_eq!(f64, stats.min_dist, 1.0));
        assert!(approx_eq!(f64, stats.max_dist, 1.0));
        assert!(approx_eq!(f64, stats.avg_min_dist, 1.0));
        assert!(approx_eq!(f64, stats.avg_max_dist, 1.0));
        assert!(approx_eq!(f64, stats.avg_dist_within, 1.0));
        assert!(approx_eq!(f64, stats.avg_dist_between, 5.0));
        Ok(())
    }

    #[test]
    fn singletons_contribute_zero_distances() -> Result<()> {
        let data = DataSet::from_vec(vec![0.0, 3.0, 4.0], 3, 1)?;
        let clustering = Clustering::from_labels(vec![0, 1, 1], 2)?;

        let stats = clustering_stats(&data, &BruteForce::new(), &clustering)?;
        assert_eq!(stats.num_populated_clusters, 2);
        assert_eq!((stats.min_cluster_size, stats.max_cluster_size), (1, 2));
        assert!(approx_eq!(f64, stats.sum_dists, 1.0));
        assert!(approx_eq!(f64, stats.min_dist, 1.0));
        // The singleton pulls the per-cluster averages down.
        assert!(approx_eq!(f64, stats.avg_dist_within, 0.5));
        Ok(())
    }

    #[test]
    fn empty_clusterings_have_empty_stats() -> Result<()> {
        let data = DataSet::from_vec(vec![0.0, 1.0], 2, 1)?;
        let clustering = Clustering::new(2)?;

        let stats = clustering_stats(&data, &BruteForce::new(), &clustering)?;
        assert_eq!(stats.num_populated_clusters, 0);
        assert_eq!(stats.num_assigned, 0);
        assert_eq!(stats.num_unassigned, 2);
        assert!(approx_eq!(f64, stats.sum_dists, 0.0));
        assert!(approx_eq!(f64, stats.avg_dist_between, 0.0));
        Ok(())
    }

    #[test]
    fn stats_round_trip_through_serde() -> Result<()> {
        let data = DataSet::from_vec(vec![0.0, 1.0, 5.0, 6.0], 4, 1)?;
        let clustering = Clustering::from_labels(vec![0, 0, 1, 1], 2)?;
        let stats = clustering_stats(&data, &BruteForce::new(), &clustering)?;

        let json = serde_json::to_string(&stats).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let back: ClusteringStats = serde_json::from_str(&json).map_err(|e| Error::InvalidInput(e.to_string()))?;
        assert_eq!(stats, back);
        Ok(())
    }

    #[test]
    fn check_enforces_the_size_floor() -> Result<()> {
        let clustering = Clustering::from_labels(vec![0, 0, 1, 1, 1], 2)?;
        assert!(check_clustering(&clustering, 2, None, None, None));
        assert!(!check_clustering(&clustering, 3, None, None, None));
        Ok(())
    }

    #[test]
    fn check_enforces_type_minimums() -> Result<()> {
        let clustering = Clustering::from_labels(vec![0, 0, 1, 1], 2)?;
        let types: Vec<TypeLabel> = vec![0, 1, 0, 0];

        // Cluster 0 has one of each type; cluster 1 has no type-1 point.
        assert!(check_clustering(&clustering, 2, Some(&types), Some(&[1, 0]), None));
        assert!(!check_clustering(&clustering, 2, Some(&types), Some(&[1, 1]), None));

        // Mismatched type arrays never pass.
        assert!(!check_clustering(&clustering, 2, Some(&types), None, None));
        assert!(!check_clustering(&clustering, 2, Some(&types[..2]), Some(&[1, 0]), None));
        Ok(())
    }

    #[test]
    fn check_requires_primary_points_assigned() -> Result<()> {
        let clustering = Clustering::from_labels(vec![0, 0, UNASSIGNED], 1)?;
        assert!(check_clustering(&clustering, 2, None, None, Some(&[0, 1])));
        assert!(!check_clustering(&clustering, 2, None, None, Some(&[0, 2])));
        assert!(!check_clustering(&clustering, 2, None, None, Some(&[7])));
        Ok(())
    }
}
