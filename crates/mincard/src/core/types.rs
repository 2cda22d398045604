//! Scalar index and label types shared across the crate.
//!
//! Arc indices are kept separate from point indices so that arc counts can
//! stay 32-bit without capping the number of points a digraph can reference.

/// Index of a point in a [`DataSet`](crate::DataSet).
pub type PointIndex = u32;

/// Index of an arc in a [`Digraph`](crate::Digraph).
pub type ArcIndex = u32;

/// Label of a cluster in a [`Clustering`](crate::Clustering).
///
/// Valid labels are in `[0, num_clusters)`; [`UNASSIGNED`] is the sentinel
/// for points that belong to no cluster.
pub type ClusterLabel = i32;

/// Label of a point type, used by the typed clustering constraints.
pub type TypeLabel = u16;

/// Sentinel label for points that belong to no cluster.
pub const UNASSIGNED: ClusterLabel = ClusterLabel::MIN;

/// The largest number of points a data set may hold.
pub const POINT_MAX: usize = i32::MAX as usize;

/// The largest number of arcs a digraph may hold.
pub const ARC_MAX: usize = u32::MAX as usize;

/// The largest number of distinct point types.
pub const TYPE_MAX: usize = u16::MAX as usize + 1;
