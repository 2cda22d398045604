//! Operations on digraphs: union, difference, transposition and subgraphs.
//!
//! All operations run in time linear in the number of arcs. Deduplication
//! uses a stamp vector indexed by vertex, so scratch space is one word per
//! vertex regardless of arc count.

use super::{Digraph, DigraphBuilder};
use crate::{ArcIndex, Error, PointIndex, Result};

impl Digraph {
    /// Creates the multiset union of the arc sets of the given digraphs,
    /// deduplicated by `(tail, head)`.
    ///
    /// Within each tail, heads keep the order of their first occurrence
    /// across `graphs`, so the union of a digraph with empty digraphs
    /// reproduces it exactly.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if `graphs` is empty or the vertex
    ///   counts disagree.
    /// - [`ErrorKind::TooLargeProblem`](crate::ErrorKind::TooLargeProblem) if the union would exceed the arc
    ///   capacity.
    pub fn union_of(graphs: &[&Self]) -> Result<Self> {
        let Some(first) = graphs.first() else {
            return Err(Error::invalid_input("cannot union zero digraphs"));
        };
        let num_vertices = first.num_vertices;
        if graphs.iter().any(|g| g.num_vertices != num_vertices) {
            return Err(Error::invalid_input("cannot union digraphs over different vertex sets"));
        }

        let mut stamp = vec![0 as ArcIndex; num_vertices];
        let mut builder = DigraphBuilder::new(num_vertices);
        for tail in 0..num_vertices {
            let round = tail as ArcIndex + 1;
            builder.row(
                graphs
                    .iter()
                    .flat_map(|g| g.out_neighbors(tail as PointIndex))
                    .copied()
                    .filter(|&h| {
                        let fresh = stamp[h as usize] != round;
                        stamp[h as usize] = round;
                        fresh
                    }),
            )?;
        }
        Ok(builder.finish())
    }

    /// Removes from `self` every arc that is also present in `subtract`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if the vertex counts disagree.
    pub fn difference_in_place(&mut self, subtract: &Self) -> Result<()> {
        if subtract.num_vertices != self.num_vertices {
            return Err(Error::invalid_input(
                "cannot subtract a digraph over a different vertex set",
            ));
        }

        let mut stamp = vec![0 as ArcIndex; self.num_vertices];
        let mut write = 0;
        for tail in 0..self.num_vertices {
            let start = self.tail_ptr[tail] as usize;
            let end = self.tail_ptr[tail + 1] as usize;

            let round = tail as ArcIndex + 1;
            for &h in subtract.out_neighbors(tail as PointIndex) {
                stamp[h as usize] = round;
            }

            self.tail_ptr[tail] = write as ArcIndex;
            for arc in start..end {
                let h = self.head[arc];
                if stamp[h as usize] != round {
                    self.head[write] = h;
                    write += 1;
                }
            }
        }
        self.tail_ptr[self.num_vertices] = write as ArcIndex;
        self.head.truncate(write);
        Ok(())
    }

    /// Creates the transpose: one arc `head -> tail` per arc `tail -> head`.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut tail_ptr = vec![0 as ArcIndex; self.num_vertices + 1];
        for &h in &self.head {
            tail_ptr[h as usize + 1] += 1;
        }
        for v in 0..self.num_vertices {
            tail_ptr[v + 1] += tail_ptr[v];
        }

        let mut cursor = tail_ptr.clone();
        let mut head = vec![0 as PointIndex; self.head.len()];
        for tail in 0..self.num_vertices {
            for &h in self.out_neighbors(tail as PointIndex) {
                head[cursor[h as usize] as usize] = tail as PointIndex;
                cursor[h as usize] += 1;
            }
        }

        Self {
            num_vertices: self.num_vertices,
            tail_ptr,
            head,
        }
    }

    /// Creates the subgraph induced by the vertices with `keep[v] == true`.
    ///
    /// The vertex set is preserved; arcs survive only when both endpoints
    /// are kept, so dropped vertices simply lose all incident arcs.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if `keep` does not cover the vertex set.
    pub fn induced_subgraph(&self, keep: &[bool]) -> Result<Self> {
        if keep.len() != self.num_vertices {
            return Err(Error::invalid_input("the vertex subset must cover the vertex set"));
        }

        let mut builder = DigraphBuilder::new(self.num_vertices);
        for tail in 0..self.num_vertices {
            if keep[tail] {
                builder.row(
                    self.out_neighbors(tail as PointIndex)
                        .iter()
                        .copied()
                        .filter(|&h| keep[h as usize]),
                )?;
            } else {
                builder.row([])?;
            }
        }
        Ok(builder.finish())
    }

    /// Returns a bitmap of the vertices reachable in one step from any of
    /// the given tails.
    #[must_use]
    pub fn adjacency_union(&self, tails: &[PointIndex]) -> Vec<bool> {
        let mut reachable = vec![false; self.num_vertices];
        for &tail in tails {
            for &h in self.out_neighbors(tail) {
                reachable[h as usize] = true;
            }
        }
        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A three-vertex digraph used across the tests below.
    fn triangle() -> Digraph {
        // 0 -> {0, 1}, 1 -> {2}, 2 -> {0}
        Digraph::from_parts(3, vec![0, 2, 3, 4], vec![0, 1, 2, 0]).map_or_else(|_| unreachable!(), |g| g)
    }

    /// The arc rows of a digraph with heads sorted, for order-insensitive
    /// comparison.
    fn sorted_rows(graph: &Digraph) -> Vec<Vec<PointIndex>> {
        (0..graph.num_vertices())
            .map(|v| {
                let mut row = graph.out_neighbors(v as PointIndex).to_vec();
                row.sort_unstable();
                row
            })
            .collect()
    }

    #[test]
    fn union_with_empty_is_identity() -> Result<()> {
        let graph = triangle();
        let empty = Digraph::empty(3);

        assert_eq!(Digraph::union_of(&[&graph, &empty])?, graph);
        assert_eq!(Digraph::union_of(&[&empty, &graph])?, graph);
        assert_eq!(Digraph::union_of(&[&graph])?, graph);
        Ok(())
    }

    #[test]
    fn union_deduplicates_and_commutes() -> Result<()> {
        let a = triangle();
        let b = Digraph::from_parts(3, vec![0, 1, 3, 3], vec![1, 2, 1])?;

        let ab = Digraph::union_of(&[&a, &b])?;
        let ba = Digraph::union_of(&[&b, &a])?;
        assert_eq!(sorted_rows(&ab), sorted_rows(&ba));

        // 0 -> {0, 1}, 1 -> {2, 1}, 2 -> {0}; the duplicate (1, 2) arc collapses.
        assert_eq!(ab.num_arcs(), 5);
        assert_eq!(sorted_rows(&ab), vec![vec![0, 1], vec![1, 2], vec![0]]);

        // Associativity up to deduplication.
        let c = Digraph::from_parts(3, vec![0, 0, 0, 1], vec![2])?;
        let left = Digraph::union_of(&[&Digraph::union_of(&[&a, &b])?, &c])?;
        let right = Digraph::union_of(&[&a, &Digraph::union_of(&[&b, &c])?])?;
        assert_eq!(sorted_rows(&left), sorted_rows(&right));
        Ok(())
    }

    #[test]
    fn union_rejects_mismatched_vertex_sets() {
        let err = Digraph::union_of(&[]).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);

        let err = Digraph::union_of(&[&Digraph::empty(2), &Digraph::empty(3)])
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn difference_removes_shared_arcs() -> Result<()> {
        let mut graph = triangle();
        let subtract = Digraph::from_parts(3, vec![0, 1, 2, 2], vec![0, 2])?;

        graph.difference_in_place(&subtract)?;
        assert!(graph.is_valid());
        assert_eq!(graph.out_neighbors(0), &[1]);
        assert_eq!(graph.out_degree(1), 0);
        assert_eq!(graph.out_neighbors(2), &[0]);

        // Subtracting the graph from itself empties it.
        let mut graph = triangle();
        let same = triangle();
        graph.difference_in_place(&same)?;
        assert_eq!(graph.num_arcs(), 0);
        assert!(graph.is_valid());
        Ok(())
    }

    #[test]
    fn transposition_reverses_arcs() {
        let graph = triangle();
        let transpose = graph.transpose();

        assert_eq!(transpose.num_arcs(), graph.num_arcs());
        assert_eq!(sorted_rows(&transpose), vec![vec![0, 2], vec![0], vec![1]]);
        assert_eq!(transpose.transpose(), graph);
    }

    #[test]
    fn induced_subgraphs_keep_the_vertex_set() -> Result<()> {
        let graph = triangle();
        let induced = graph.induced_subgraph(&[true, false, true])?;

        assert_eq!(induced.num_vertices(), 3);
        assert_eq!(induced.out_neighbors(0), &[0]);
        assert_eq!(induced.out_degree(1), 0);
        assert_eq!(induced.out_neighbors(2), &[0]);

        let err = graph.induced_subgraph(&[true]).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn adjacency_union_marks_one_step_heads() {
        let graph = triangle();
        assert_eq!(graph.adjacency_union(&[0]), vec![true, true, false]);
        assert_eq!(graph.adjacency_union(&[0, 1]), vec![true, true, true]);
        assert_eq!(graph.adjacency_union(&[]), vec![false, false, false]);
    }
}
