//! A compact directed graph in compressed sparse row layout.
//!
//! Sparse digraphs are the backbone of the nearest-neighbor-graph clustering
//! pipeline: the k-NN graph, the seed exclusion relation and the typed
//! adjacency unions are all instances of this struct.

mod ops;

use crate::{ArcIndex, Error, PointIndex, Result, ARC_MAX};

/// A directed graph over the vertices `[0, num_vertices)` in compressed
/// sparse row layout.
///
/// `tail_ptr` holds `num_vertices + 1` non-decreasing arc offsets; the
/// out-neighbors of vertex `v` are `head[tail_ptr[v]..tail_ptr[v + 1]]`.
/// Arc indices are 32-bit, so a digraph holds at most [`ARC_MAX`] arcs.
/// Self-loops are permitted. No ordering of heads within a tail is
/// guaranteed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Digraph {
    /// The number of vertices.
    num_vertices: usize,
    /// Arc offsets per vertex, `num_vertices + 1` non-decreasing values.
    tail_ptr: Vec<ArcIndex>,
    /// Head vertices per arc.
    head: Vec<PointIndex>,
}

impl Digraph {
    /// Creates a digraph over `num_vertices` vertices with no arcs.
    #[must_use]
    pub fn empty(num_vertices: usize) -> Self {
        Self {
            num_vertices,
            tail_ptr: vec![0; num_vertices + 1],
            head: Vec::new(),
        }
    }

    /// Creates a digraph from raw compressed-sparse-row arrays.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if the offsets are not
    ///   `num_vertices + 1` non-decreasing values starting at zero and
    ///   ending at `head.len()`, or if any head is out of range.
    /// - [`ErrorKind::TooLargeProblem`](crate::ErrorKind::TooLargeProblem) if there are more than [`ARC_MAX`] arcs.
    pub fn from_parts(num_vertices: usize, tail_ptr: Vec<ArcIndex>, head: Vec<PointIndex>) -> Result<Self> {
        if head.len() > ARC_MAX {
            return Err(Error::too_large(format!(
                "{} arcs exceed the supported maximum of {ARC_MAX}",
                head.len()
            )));
        }
        if tail_ptr.len() != num_vertices + 1 {
            return Err(Error::invalid_input(format!(
                "expected {} arc offsets, got {}",
                num_vertices + 1,
                tail_ptr.len()
            )));
        }
        if tail_ptr[0] != 0 || tail_ptr[num_vertices] as usize != head.len() {
            return Err(Error::invalid_input("arc offsets must span exactly the head array"));
        }
        if tail_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::invalid_input("arc offsets must be non-decreasing"));
        }
        if head.iter().any(|&h| (h as usize) >= num_vertices) {
            return Err(Error::invalid_input("arc heads must be valid vertices"));
        }
        Ok(Self {
            num_vertices,
            tail_ptr,
            head,
        })
    }

    /// The number of vertices.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// The number of arcs.
    #[must_use]
    pub fn num_arcs(&self) -> usize {
        self.head.len()
    }

    /// The out-neighbors of the vertex at `tail`.
    #[must_use]
    pub fn out_neighbors(&self, tail: PointIndex) -> &[PointIndex] {
        let start = self.tail_ptr[tail as usize] as usize;
        let end = self.tail_ptr[tail as usize + 1] as usize;
        &self.head[start..end]
    }

    /// The out-degree of the vertex at `tail`.
    #[must_use]
    pub fn out_degree(&self, tail: PointIndex) -> usize {
        self.out_neighbors(tail).len()
    }

    /// Checks the structural invariants; for debugging producers of raw
    /// digraphs.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.tail_ptr.len() == self.num_vertices + 1
            && self.tail_ptr[0] == 0
            && self.tail_ptr[self.num_vertices] as usize == self.head.len()
            && self.tail_ptr.windows(2).all(|w| w[0] <= w[1])
            && self.head.iter().all(|&h| (h as usize) < self.num_vertices)
    }
}

/// An incremental builder that appends one out-neighbor row per vertex, in
/// vertex order.
#[derive(Debug)]
pub(crate) struct DigraphBuilder {
    /// The number of vertices of the digraph under construction.
    num_vertices: usize,
    /// Arc offsets written so far.
    tail_ptr: Vec<ArcIndex>,
    /// Heads written so far.
    head: Vec<PointIndex>,
}

impl DigraphBuilder {
    /// Creates a builder for a digraph over `num_vertices` vertices.
    pub fn new(num_vertices: usize) -> Self {
        let mut tail_ptr = Vec::with_capacity(num_vertices + 1);
        tail_ptr.push(0);
        Self {
            num_vertices,
            tail_ptr,
            head: Vec::new(),
        }
    }

    /// Appends the out-neighbor row of the next vertex.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::TooLargeProblem`](crate::ErrorKind::TooLargeProblem) if the arc count would exceed
    ///   [`ARC_MAX`].
    pub fn row(&mut self, heads: impl IntoIterator<Item = PointIndex>) -> Result<()> {
        debug_assert!(self.tail_ptr.len() <= self.num_vertices);
        self.head.extend(heads);
        if self.head.len() > ARC_MAX {
            return Err(Error::too_large(format!(
                "digraph arc count exceeds the supported maximum of {ARC_MAX}"
            )));
        }
        self.tail_ptr.push(self.head.len() as ArcIndex);
        Ok(())
    }

    /// Finishes the digraph. Vertices without an appended row get no arcs.
    pub fn finish(mut self) -> Digraph {
        debug_assert!(self.tail_ptr.len() <= self.num_vertices + 1);
        let last = *self.tail_ptr.last().unwrap_or(&0);
        self.tail_ptr.resize(self.num_vertices + 1, last);
        Digraph {
            num_vertices: self.num_vertices,
            tail_ptr: self.tail_ptr,
            head: self.head,
        }
    }
}
