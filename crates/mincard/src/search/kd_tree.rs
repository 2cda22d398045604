//! The tree-based approximate distance-search backend.

use super::brute::ScanMaxSearch;
use super::{check_query, check_radius, check_search_set, DistanceSearch, MaxDistSearch, NnSearch};
use crate::utils::{DistItem, SizedHeap};
use crate::{DataSet, Error, PointIndex, Result};

/// How a kd-tree node chooses its splitting hyperplane.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum SplitRule {
    /// Split at the median coordinate of the widest dimension. Trees are
    /// balanced regardless of the point distribution.
    #[default]
    Median,
    /// Split at the midpoint of the widest dimension, sliding the plane to
    /// the nearest point when one side would be empty. Cells stay close to
    /// cubical, which helps on clustered data.
    SlidingMidpoint,
}

/// The tree-based backend: nearest-neighbor queries are answered through a
/// bucketed kd-tree built over the search points.
///
/// With the default approximation factor of zero the results are exact and
/// identical to [`BruteForce`](super::BruteForce), including tie order.
/// With `eps > 0`, returned neighbors may be up to a factor `1 + eps`
/// farther than the true ones, in exchange for fewer distance computations.
#[derive(Clone, Copy, Debug)]
pub struct KdTree {
    /// The approximation factor; zero means exact.
    eps: f64,
    /// The maximum number of points per leaf.
    bucket_size: usize,
    /// The split rule for interior nodes.
    split_rule: SplitRule,
}

impl Default for KdTree {
    fn default() -> Self {
        Self {
            eps: 0.0,
            bucket_size: 8,
            split_rule: SplitRule::Median,
        }
    }
}

impl KdTree {
    /// Creates a kd-tree backend with exact search and the default bucket
    /// size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the approximation factor. Validated when a search is opened.
    #[must_use]
    pub const fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Sets the maximum number of points per leaf. Validated when a search
    /// is opened.
    #[must_use]
    pub const fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Sets the split rule for interior nodes.
    #[must_use]
    pub const fn with_split_rule(mut self, split_rule: SplitRule) -> Self {
        self.split_rule = split_rule;
        self
    }

    /// Validates the builder options.
    fn check_options(&self) -> Result<()> {
        if !(self.eps.is_finite() && self.eps >= 0.0) {
            return Err(Error::invalid_input(format!(
                "the approximation factor must be non-negative and finite, got {}",
                self.eps
            )));
        }
        if self.bucket_size == 0 {
            return Err(Error::invalid_input("the bucket size must be at least 1"));
        }
        Ok(())
    }
}

impl DistanceSearch for KdTree {
    fn open_max_search<'a>(
        &self,
        data: &'a DataSet<'a>,
        search_points: &[PointIndex],
    ) -> Result<Box<dyn MaxDistSearch + 'a>> {
        self.check_options()?;
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
        self.check_options()?;
        if k == 0 {
            return Err(Error::invalid_input("a nearest-neighbor search needs k >= 1"));
        }
        check_radius(radius)?;
        let items = check_search_set(data, search_points)?;
        let index = KdIndex::build(data, items, self.bucket_size, self.split_rule);
        Ok(Box::new(KdNnSearch {
            data,
            index,
            k,
            radius,
            eps: self.eps,
            results: Vec::with_capacity(k),
        }))
    }
}

/// A node of the kd-tree. The left child of a split node immediately
/// follows it in the node array; only the right child needs an index.
#[derive(Debug)]
enum Node {
    /// A leaf holding the items in `items[start..end]`.
    Leaf {
        /// First item of the leaf.
        start: u32,
        /// One past the last item of the leaf.
        end: u32,
    },
    /// An interior node splitting on `coord[dim] < value`.
    Split {
        /// The splitting dimension.
        dim: u32,
        /// The splitting value; the left subtree holds coordinates strictly
        /// below it, the right subtree the rest.
        value: f64,
        /// Index of the right child node.
        right: u32,
    },
}

/// A kd-tree over a set of search points.
#[derive(Debug)]
struct KdIndex {
    /// The nodes, root first, left children in pre-order position.
    nodes: Vec<Node>,
    /// The search points, reordered so every leaf covers a contiguous range.
    items: Vec<PointIndex>,
}

impl KdIndex {
    /// Builds the tree over the given search points.
    fn build(data: &DataSet, mut items: Vec<PointIndex>, bucket_size: usize, split_rule: SplitRule) -> Self {
        let mut nodes = Vec::with_capacity(2 * items.len() / bucket_size.max(1) + 1);
        let end = items.len();
        build_node(data, &mut nodes, &mut items, 0, end, bucket_size, split_rule);
        Self { nodes, items }
    }
}

/// Recursively builds the node covering `items[start..end]` and returns its
/// index in the node array.
fn build_node(
    data: &DataSet,
    nodes: &mut Vec<Node>,
    items: &mut [PointIndex],
    start: usize,
    end: usize,
    bucket_size: usize,
    split_rule: SplitRule,
) -> u32 {
    let index = nodes.len() as u32;
    nodes.push(Node::Leaf {
        start: start as u32,
        end: end as u32,
    });
    if end - start <= bucket_size {
        return index;
    }

    // The splitting dimension is the one with the widest extent.
    let (dim, min, max) = widest_dimension(data, &items[start..end]);
    if max <= min {
        // All points coincide; no hyperplane can separate them.
        return index;
    }

    // Sorting by coordinate makes the split a single partition point and
    // keeps the build deterministic for tied coordinates.
    items[start..end].sort_unstable_by(|&a, &b| {
        data.point(a)[dim]
            .total_cmp(&data.point(b)[dim])
            .then(a.cmp(&b))
    });

    let value = split_value(data, &items[start..end], dim, min, max, split_rule);
    let mid = start + items[start..end].partition_point(|&p| data.point(p)[dim] < value);
    debug_assert!(mid > start && mid < end);

    build_node(data, nodes, items, start, mid, bucket_size, split_rule);
    let right = build_node(data, nodes, items, mid, end, bucket_size, split_rule);
    nodes[index as usize] = Node::Split {
        dim: dim as u32,
        value,
        right,
    };
    index
}

/// Returns the dimension with the widest coordinate extent over the items,
/// together with its minimum and maximum. Ties go to the lower dimension.
fn widest_dimension(data: &DataSet, items: &[PointIndex]) -> (usize, f64, f64) {
    let mut best = (0, f64::INFINITY, f64::NEG_INFINITY);
    for dim in 0..data.num_dims() {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &p in items {
            let c = data.point(p)[dim];
            min = min.min(c);
            max = max.max(c);
        }
        if max - min > best.2 - best.1 {
            best = (dim, min, max);
        }
    }
    best
}

/// Chooses the splitting value for a sorted run of items, guaranteeing that
/// both sides of the `coord < value` partition are non-empty.
fn split_value(data: &DataSet, sorted: &[PointIndex], dim: usize, min: f64, max: f64, split_rule: SplitRule) -> f64 {
    let candidate = match split_rule {
        SplitRule::Median => data.point(sorted[sorted.len() / 2])[dim],
        SplitRule::SlidingMidpoint => (min + max) / 2.0,
    };
    if candidate > min {
        candidate
    } else {
        // Slide the plane just past the minimum so the low side keeps the
        // points at the minimum coordinate.
        match sorted.iter().map(|&p| data.point(p)[dim]).find(|&c| c > min) {
            Some(next) => next,
            None => max,
        }
    }
}

/// An open k-nearest-neighbor search through a kd-tree.
struct KdNnSearch<'a> {
    /// The data set queried against.
    data: &'a DataSet<'a>,
    /// The tree over the search points.
    index: KdIndex,
    /// The number of neighbors per query.
    k: usize,
    /// Neighbors farther than this are excluded.
    radius: Option<f64>,
    /// The approximation factor; zero means exact.
    eps: f64,
    /// The result buffer returned to the caller, reused across queries.
    results: Vec<PointIndex>,
}

impl KdNnSearch<'_> {
    /// Visits the subtree rooted at `node`, pushing candidates onto the heap
    /// and pruning branches that cannot contribute.
    fn visit(&self, node: u32, query: &[f64], heap: &mut SizedHeap) {
        match self.index.nodes[node as usize] {
            Node::Leaf { start, end } => {
                for &p in &self.index.items[start as usize..end as usize] {
                    let d: f64 = distances::vectors::euclidean(query, self.data.point(p));
                    if self.radius.map_or(true, |r| d <= r) {
                        heap.push(DistItem(d, p));
                    }
                }
            }
            Node::Split { dim, value, right } => {
                // `gap` is a lower bound on the distance from the query to
                // any point in the farther subtree.
                let diff = query[dim as usize] - value;
                let (near, far) = if diff < 0.0 { (node + 1, right) } else { (right, node + 1) };
                let gap = diff.abs();

                self.visit(near, query, heap);

                if self.radius.is_some_and(|r| gap > r) {
                    return;
                }
                let worth_visiting = match heap.worst() {
                    Some(worst) if heap.is_full() => gap <= worst.0 / (1.0 + self.eps),
                    _ => true,
                };
                if worth_visiting {
                    self.visit(far, query, heap);
                }
            }
        }
    }
}

impl NnSearch for KdNnSearch<'_> {
    fn k(&self) -> usize {
        self.k
    }

    fn knn(&mut self, query: PointIndex) -> Result<&[PointIndex]> {
        check_query(self.data, query)?;

        let mut heap = SizedHeap::new(self.k);
        self.visit(0, self.data.point(query), &mut heap);

        self.results.clear();
        self.results.extend(heap.into_sorted().iter().map(|item| item.1));
        Ok(&self.results)
    }
}
