//! Size-constrained clustering: partition a data set so that every cluster
//! meets a minimum cardinality, optionally with per-type minimums.
//!
//! Two engines are provided:
//!
//! - [`sc_clustering`]: converts a k-nearest-neighbor digraph into
//!   seed-anchored, size-guaranteed clusters and assigns the remaining
//!   points, with variants for batched operation and per-type minimums.
//! - [`hierarchical_clustering`]: recursively splits the data set along an
//!   approximate diameter until every block fits the size constraint.
//!
//! Both engines compute distances through a pluggable [`DistanceSearch`]
//! backend: the exact [`BruteForce`] or the tree-based [`KdTree`].
//!
//! ```
//! use mincard::{sc_clustering, BruteForce, DataSet, NngParams};
//!
//! let coords = [0.0, 0.0, 0.0, 1.0, 10.0, 0.0, 10.0, 1.0];
//! let data = DataSet::new(&coords, 4, 2)?;
//!
//! let clustering = sc_clustering(&data, &BruteForce::new(), &NngParams::new(2))?;
//! assert_eq!(clustering.num_clusters(), 2);
//! assert_eq!(clustering.label(0), clustering.label(1));
//! assert_ne!(clustering.label(0), clustering.label(2));
//! # Ok::<(), mincard::Error>(())
//! ```

mod core;
mod graph;
mod hierarchical;
mod nng;
mod search;
mod stats;
mod utils;

pub use self::core::{
    ArcIndex, ClusterLabel, Clustering, DataSet, Error, ErrorKind, Labels, PointIndex, Result, TypeLabel, ARC_MAX,
    POINT_MAX, TYPE_MAX, UNASSIGNED,
};
pub use graph::Digraph;
pub use hierarchical::{hierarchical_clustering, refine_clustering};
pub use nng::{sc_clustering, sc_clustering_into, NngParams, SeedMethod, UnassignedMethod};
pub use search::{BruteForce, DistanceSearch, KdTree, MaxDistSearch, NnSearch, SplitRule};
pub use stats::{check_clustering, clustering_stats, ClusteringStats};
