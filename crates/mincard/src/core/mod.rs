//! Core value objects: data sets, clusterings, errors and index types.

mod clustering;
mod dataset;
mod error;
mod types;

pub use clustering::{Clustering, Labels};
pub use dataset::DataSet;
pub use error::{Error, ErrorKind, Result};
pub use types::{ArcIndex, ClusterLabel, PointIndex, TypeLabel, ARC_MAX, POINT_MAX, TYPE_MAX, UNASSIGNED};
