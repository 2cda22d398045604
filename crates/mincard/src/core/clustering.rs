//! A `Clustering` assigns each point of a data set to at most one cluster.

use super::{ClusterLabel, Error, PointIndex, Result, UNASSIGNED};

/// The label storage of a [`Clustering`].
///
/// Labels either live in a buffer owned by the clustering or in a buffer
/// owned by the caller; the engine writes through either one and frees only
/// the owned variant.
#[derive(Debug)]
pub enum Labels<'a> {
    /// The clustering owns its label buffer.
    Owned(Vec<ClusterLabel>),
    /// The caller owns the label buffer and retains it after the clustering
    /// is dropped.
    Borrowed(&'a mut [ClusterLabel]),
}

impl Labels<'_> {
    /// A shared view of the labels.
    fn as_slice(&self) -> &[ClusterLabel] {
        match self {
            Labels::Owned(labels) => labels,
            Labels::Borrowed(labels) => labels,
        }
    }

    /// A mutable view of the labels.
    fn as_mut_slice(&mut self) -> &mut [ClusterLabel] {
        match self {
            Labels::Owned(labels) => labels,
            Labels::Borrowed(labels) => labels,
        }
    }
}

/// A partition of the points `[0, N)` into `num_clusters` clusters, with
/// [`UNASSIGNED`] marking points that belong to no cluster.
///
/// # Invariants
///
/// - Every label is either [`UNASSIGNED`] or in `[0, num_clusters)`.
/// - If `num_clusters == 0`, every label is [`UNASSIGNED`]; otherwise every
///   label in `[0, num_clusters)` is carried by at least one point.
///
/// Constructors validate these invariants; the clustering engines maintain
/// them.
#[derive(Debug)]
pub struct Clustering<'a> {
    /// The number of clusters.
    num_clusters: usize,
    /// One label per point.
    labels: Labels<'a>,
}

impl Clustering<'static> {
    /// Creates a clustering over `num_points` points with every point
    /// unassigned, backed by an internally allocated label buffer.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](super::ErrorKind::InvalidInput) if `num_points` is zero.
    pub fn new(num_points: usize) -> Result<Self> {
        if num_points == 0 {
            return Err(Error::invalid_input("a clustering must cover at least one point"));
        }
        Ok(Self {
            num_clusters: 0,
            labels: Labels::Owned(vec![UNASSIGNED; num_points]),
        })
    }

    /// Creates a clustering from an existing label vector.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](super::ErrorKind::InvalidInput) if the labels violate the invariants
    ///   documented on [`Clustering`].
    pub fn from_labels(labels: Vec<ClusterLabel>, num_clusters: usize) -> Result<Self> {
        validate(&labels, num_clusters)?;
        Ok(Self {
            num_clusters,
            labels: Labels::Owned(labels),
        })
    }
}

impl<'a> Clustering<'a> {
    /// Creates an all-unassigned clustering writing through a caller-owned
    /// label buffer. The buffer is overwritten with [`UNASSIGNED`].
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](super::ErrorKind::InvalidInput) if the buffer is empty.
    pub fn with_buffer(buffer: &'a mut [ClusterLabel]) -> Result<Self> {
        if buffer.is_empty() {
            return Err(Error::invalid_input("a clustering must cover at least one point"));
        }
        buffer.fill(UNASSIGNED);
        Ok(Self {
            num_clusters: 0,
            labels: Labels::Borrowed(buffer),
        })
    }

    /// Creates a clustering from labels in a caller-owned buffer, e.g. to
    /// refine an existing clustering in place.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](super::ErrorKind::InvalidInput) if the labels violate the invariants
    ///   documented on [`Clustering`].
    pub fn from_buffer(buffer: &'a mut [ClusterLabel], num_clusters: usize) -> Result<Self> {
        validate(buffer, num_clusters)?;
        Ok(Self {
            num_clusters,
            labels: Labels::Borrowed(buffer),
        })
    }

    /// The number of points covered by the clustering.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.labels.as_slice().len()
    }

    /// The number of clusters.
    #[must_use]
    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// One label per point, [`UNASSIGNED`] for points in no cluster.
    #[must_use]
    pub fn labels(&self) -> &[ClusterLabel] {
        self.labels.as_slice()
    }

    /// The label of the point at `index`.
    #[must_use]
    pub fn label(&self, index: PointIndex) -> ClusterLabel {
        self.labels.as_slice()[index as usize]
    }

    /// Whether the point at `index` belongs to a cluster.
    #[must_use]
    pub fn is_assigned(&self, index: PointIndex) -> bool {
        self.label(index) != UNASSIGNED
    }

    /// Consumes the clustering and returns its label storage.
    #[must_use]
    pub fn into_labels(self) -> Labels<'a> {
        self.labels
    }

    /// A mutable view of the labels, for the clustering engines.
    pub(crate) fn labels_mut(&mut self) -> &mut [ClusterLabel] {
        self.labels.as_mut_slice()
    }

    /// Overwrites the cluster count, for the clustering engines.
    pub(crate) fn set_num_clusters(&mut self, num_clusters: usize) {
        self.num_clusters = num_clusters;
    }

    /// Renumbers the labels so that they densely cover `[0, K)` for some
    /// `K <= num_clusters`, preserving the relative order of labels.
    pub(crate) fn renumber(&mut self) {
        let mut used = vec![false; self.num_clusters];
        for &label in self.labels.as_slice() {
            if label != UNASSIGNED {
                used[label as usize] = true;
            }
        }

        let mut remap = vec![UNASSIGNED; self.num_clusters];
        let mut next = 0;
        for (old, &occupied) in used.iter().enumerate() {
            if occupied {
                remap[old] = next;
                next += 1;
            }
        }

        for label in self.labels.as_mut_slice() {
            if *label != UNASSIGNED {
                *label = remap[*label as usize];
            }
        }
        self.num_clusters = next as usize;
    }
}

impl Clone for Clustering<'_> {
    fn clone(&self) -> Self {
        Self {
            num_clusters: self.num_clusters,
            labels: Labels::Owned(self.labels.as_slice().to_vec()),
        }
    }
}

impl PartialEq for Clustering<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.num_clusters == other.num_clusters && self.labels() == other.labels()
    }
}

impl Eq for Clustering<'_> {}

/// Validates a label array against the [`Clustering`] invariants.
fn validate(labels: &[ClusterLabel], num_clusters: usize) -> Result<()> {
    if labels.is_empty() {
        return Err(Error::invalid_input("a clustering must cover at least one point"));
    }
    if num_clusters > i32::MAX as usize {
        return Err(Error::invalid_input(format!(
            "{num_clusters} clusters exceed the label range"
        )));
    }

    let mut occupied = vec![false; num_clusters];
    for (i, &label) in labels.iter().enumerate() {
        if label == UNASSIGNED {
            continue;
        }
        if label < 0 || (label as usize) >= num_clusters {
            return Err(Error::invalid_input(format!(
                "label {label} of point {i} is outside [0, {num_clusters})"
            )));
        }
        occupied[label as usize] = true;
    }
    if let Some(empty) = occupied.iter().position(|&o| !o) {
        return Err(Error::invalid_input(format!("cluster {empty} has no members")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn fresh_clusterings_are_unassigned() -> Result<()> {
        let clustering = Clustering::new(4)?;
        assert_eq!(clustering.num_points(), 4);
        assert_eq!(clustering.num_clusters(), 0);
        assert!(clustering.labels().iter().all(|&l| l == UNASSIGNED));
        assert!(!clustering.is_assigned(2));
        Ok(())
    }

    #[test]
    fn external_buffers_stay_with_the_caller() -> Result<()> {
        let mut buffer = vec![7; 3];
        {
            let mut clustering = Clustering::with_buffer(&mut buffer)?;
            assert_eq!(clustering.labels(), &[UNASSIGNED; 3]);
            clustering.labels_mut().copy_from_slice(&[0, 0, 1]);
            clustering.set_num_clusters(2);
        }
        // The caller sees the labels written through the buffer.
        assert_eq!(buffer, vec![0, 0, 1]);
        Ok(())
    }

    #[test]
    fn validation_enforces_the_invariants() {
        assert!(Clustering::from_labels(vec![0, 1, 0], 2).is_ok());
        assert!(Clustering::from_labels(vec![UNASSIGNED, UNASSIGNED], 0).is_ok());

        // Out-of-range label.
        let err = Clustering::from_labels(vec![0, 2], 2).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // Cluster 1 has no members.
        let err = Clustering::from_labels(vec![0, 0], 2).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // Negative labels other than the sentinel are rejected.
        let err = Clustering::from_labels(vec![-1, 0], 1).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn renumbering_densifies_labels() -> Result<()> {
        let mut clustering = Clustering::new(5)?;
        clustering.labels_mut().copy_from_slice(&[4, UNASSIGNED, 2, 4, 2]);
        clustering.set_num_clusters(5);

        clustering.renumber();
        assert_eq!(clustering.num_clusters(), 2);
        assert_eq!(clustering.labels(), &[1, UNASSIGNED, 0, 1, 0]);
        Ok(())
    }

    #[test]
    fn clones_own_their_labels() -> Result<()> {
        let mut buffer = vec![UNASSIGNED; 2];
        let original = {
            let mut clustering = Clustering::with_buffer(&mut buffer)?;
            clustering.labels_mut().copy_from_slice(&[0, 1]);
            clustering.set_num_clusters(2);
            clustering.clone()
        };
        assert_eq!(original.labels(), &[0, 1]);
        assert!(matches!(original.into_labels(), Labels::Owned(_)));
        Ok(())
    }
}
