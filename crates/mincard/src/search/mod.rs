//! The distance-search capability seam between the clustering engines and
//! their backends.
//!
//! The engines never compute distances directly; they go through a
//! [`DistanceSearch`] implementation chosen by the caller at construction
//! time. Two backends ship with the crate: the deterministic, exact
//! [`BruteForce`] and the tree-based [`KdTree`] with a configurable
//! approximation factor.

mod brute;
mod kd_tree;

pub use brute::BruteForce;
pub use kd_tree::{KdTree, SplitRule};

use rayon::prelude::*;

use crate::{DataSet, Error, PointIndex, Result};

/// The distance and nearest-neighbor capabilities a clustering engine needs.
///
/// All distances are Euclidean: non-negative, symmetric and satisfying the
/// triangle inequality.
pub trait DistanceSearch {
    /// Whether this backend can serve searches over the given data set.
    fn check(&self, data: &DataSet) -> bool {
        let _ = data;
        true
    }

    /// Computes the dense `points x points` distance matrix, row-major.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if any index is out of range.
    fn distance_matrix(&self, data: &DataSet, points: &[PointIndex]) -> Result<Vec<f64>> {
        check_points(data, points)?;
        let n = points.len();
        let mut out = vec![0.0; n * n];
        out.par_chunks_mut(n.max(1)).enumerate().for_each(|(r, row)| {
            for (c, &q) in points.iter().enumerate() {
                row[c] = data.distance(points[r], q);
            }
        });
        Ok(out)
    }

    /// Computes the dense `queries x columns` distance matrix, row-major.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if any index is out of range.
    fn distance_rows(&self, data: &DataSet, queries: &[PointIndex], columns: &[PointIndex]) -> Result<Vec<f64>> {
        check_points(data, queries)?;
        check_points(data, columns)?;
        let n = columns.len();
        let mut out = vec![0.0; queries.len() * n];
        out.par_chunks_mut(n.max(1)).enumerate().for_each(|(r, row)| {
            for (c, &q) in columns.iter().enumerate() {
                row[c] = data.distance(queries[r], q);
            }
        });
        Ok(out)
    }

    /// Opens a farthest-point search over the given search points.
    ///
    /// The handle is closed by dropping it.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if the search set is empty or holds
    ///   out-of-range or duplicate indices.
    fn open_max_search<'a>(
        &self,
        data: &'a DataSet<'a>,
        search_points: &[PointIndex],
    ) -> Result<Box<dyn MaxDistSearch + 'a>>;

    /// Opens a k-nearest-neighbor search over the given search points,
    /// optionally constrained to neighbors within `radius`.
    ///
    /// The handle is closed by dropping it.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if `k` is zero, the radius is not
    ///   positive and finite, or the search set is empty or holds
    ///   out-of-range or duplicate indices.
    fn open_nn_search<'a>(
        &self,
        data: &'a DataSet<'a>,
        k: usize,
        radius: Option<f64>,
        search_points: &[PointIndex],
    ) -> Result<Box<dyn NnSearch + 'a>>;
}

/// An open farthest-point search handle.
pub trait MaxDistSearch {
    /// Returns the search point farthest from `query` together with its
    /// distance.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::DistSearchError`](crate::ErrorKind::DistSearchError) if the query index is out of
    ///   range.
    fn max_dist(&mut self, query: PointIndex) -> Result<(PointIndex, f64)>;
}

/// An open k-nearest-neighbor search handle.
pub trait NnSearch {
    /// The number of neighbors requested per query.
    fn k(&self) -> usize;

    /// Returns up to `k` search points nearest to `query`, ordered by
    /// ascending distance with ties broken by ascending point index. Fewer
    /// than `k` points are returned only when the radius excludes the rest.
    ///
    /// The slice borrows the handle and is overwritten by the next query.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::DistSearchError`](crate::ErrorKind::DistSearchError) if the query index is out of
    ///   range.
    fn knn(&mut self, query: PointIndex) -> Result<&[PointIndex]>;
}

/// Validates that the given indices name points of the data set.
fn check_points(data: &DataSet, points: &[PointIndex]) -> Result<()> {
    if let Some(&bad) = points.iter().find(|&&p| (p as usize) >= data.num_points()) {
        return Err(Error::invalid_input(format!(
            "point index {bad} is outside the data set of {} points",
            data.num_points()
        )));
    }
    Ok(())
}

/// Validates the arguments shared by both `open_*` operations and returns
/// an owned copy of the search set.
fn check_search_set(data: &DataSet, search_points: &[PointIndex]) -> Result<Vec<PointIndex>> {
    if search_points.is_empty() {
        return Err(Error::invalid_input("the search point set is empty"));
    }
    check_points(data, search_points)?;

    let mut seen = vec![false; data.num_points()];
    for &p in search_points {
        if seen[p as usize] {
            return Err(Error::invalid_input(format!(
                "point index {p} appears twice in the search point set"
            )));
        }
        seen[p as usize] = true;
    }
    Ok(search_points.to_vec())
}

/// Validates an optional search radius.
fn check_radius(radius: Option<f64>) -> Result<()> {
    match radius {
        Some(r) if !(r.is_finite() && r > 0.0) => {
            Err(Error::invalid_input(format!("search radius must be positive and finite, got {r}")))
        }
        _ => Ok(()),
    }
}

/// Validates a query index against the data set, reporting a backend error.
fn check_query(data: &DataSet, query: PointIndex) -> Result<()> {
    if (query as usize) >= data.num_points() {
        return Err(Error::DistSearch(format!(
            "query point {query} is outside the data set of {} points",
            data.num_points()
        )));
    }
    Ok(())
}
