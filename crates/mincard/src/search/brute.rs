//! The exact brute-force distance-search backend.

use super::{check_query, check_radius, check_search_set, DistanceSearch, MaxDistSearch, NnSearch};
use crate::utils::{DistItem, SizedHeap};
use crate::{DataSet, Error, PointIndex, Result};

/// The deterministic, exact backend: every query is answered by a linear
/// scan over the search points.
///
/// Identical inputs always produce identical results, including between
/// points at exactly equal distances, so this is the backend for the
/// engine's reproducibility guarantees.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForce;

impl BruteForce {
    /// Creates a new brute-force backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DistanceSearch for BruteForce {
    fn open_max_search<'a>(
        &self,
        data: &'a DataSet<'a>,
        search_points: &[PointIndex],
    ) -> Result<Box<dyn MaxDistSearch + 'a>> {
        let search = check_search_set(data, search_points)?;
        Ok(Box::new(ScanMaxSearch { data, search }))
    }

    fn open_nn_search<'a>(
        &self,
        data: &'a DataSet<'a>,
        k: usize,
        radius: Option<f64>,
        search_points: &[PointIndex],
    ) -> Result<Box<dyn NnSearch + 'a>> {
        if k == 0 {
            return Err(Error::invalid_input("a nearest-neighbor search needs k >= 1"));
        }
        check_radius(radius)?;
        let search = check_search_set(data, search_points)?;
        Ok(Box::new(ScanNnSearch {
            data,
            search,
            k,
            radius,
            results: Vec::with_capacity(k),
        }))
    }
}

/// An open farthest-point scan, shared with the kd-tree backend which keeps
/// no bounding volumes to prune farthest-point queries with.
pub(super) struct ScanMaxSearch<'a> {
    /// The data set queried against.
    pub(super) data: &'a DataSet<'a>,
    /// The points scanned by each query.
    pub(super) search: Vec<PointIndex>,
}

impl MaxDistSearch for ScanMaxSearch<'_> {
    fn max_dist(&mut self, query: PointIndex) -> Result<(PointIndex, f64)> {
        check_query(self.data, query)?;

        let mut arg = self.search[0];
        let mut max = self.data.distance(query, arg);
        for &p in &self.search[1..] {
            let d = self.data.distance(query, p);
            // Ties go to the smaller point index.
            if d > max || (d == max && p < arg) {
                arg = p;
                max = d;
            }
        }
        Ok((arg, max))
    }
}

/// An open k-nearest-neighbor scan.
struct ScanNnSearch<'a> {
    /// The data set queried against.
    data: &'a DataSet<'a>,
    /// The points scanned by each query.
    search: Vec<PointIndex>,
    /// The number of neighbors per query.
    k: usize,
    /// Neighbors farther than this are excluded.
    radius: Option<f64>,
    /// The result buffer returned to the caller, reused across queries.
    results: Vec<PointIndex>,
}

impl NnSearch for ScanNnSearch<'_> {
    fn k(&self) -> usize {
        self.k
    }

    fn knn(&mut self, query: PointIndex) -> Result<&[PointIndex]> {
        check_query(self.data, query)?;

        let mut heap = SizedHeap::new(self.k);
        for &p in &self.search {
            let d = self.data.distance(query, p);
            if self.radius.map_or(true, |r| d <= r) {
                heap.push(DistItem(d, p));
            }
        }

        self.results.clear();
        self.results.extend(heap.into_sorted().iter().map(|item| item.1));
        Ok(&self.results)
    }
}
