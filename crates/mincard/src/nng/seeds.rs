//! Seed selection over the k-nearest-neighbor digraph.
//!
//! A seed anchors a cluster made of itself and its out-neighbors, so no two
//! seeds may share an out-neighbor. The methods below differ only in the
//! order in which vertices are offered the chance to become a seed; the
//! selection rule itself is fixed.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::graph::{Digraph, DigraphBuilder};
use crate::{ArcIndex, PointIndex, Result};

/// The order in which vertices are considered for seed selection.
///
/// The discriminants are stable codes shared with language bindings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[repr(i32)]
pub enum SeedMethod {
    /// Point index ascending.
    #[default]
    Lexical = 0,
    /// Ascending in-degree in the k-NN digraph; ties by point index.
    InwardsOrder = 1,
    /// Ascending in-degree counted against the vertices not yet excluded,
    /// updated after each selection.
    InwardsUpdating = 2,
    /// Ascending number of vertices barred from seedhood by selecting the
    /// vertex; computed once up front.
    ExclusionOrder = 3,
    /// As [`SeedMethod::ExclusionOrder`], but the counts ignore vertices
    /// that have already been excluded, updated after each selection.
    ExclusionUpdating = 4,
}

impl SeedMethod {
    /// The stable integer code of this method.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Looks a method up by its stable integer code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Lexical),
            1 => Some(Self::InwardsOrder),
            2 => Some(Self::InwardsUpdating),
            3 => Some(Self::ExclusionOrder),
            4 => Some(Self::ExclusionUpdating),
            _ => None,
        }
    }
}

/// Selects a maximal sequence of seeds from the k-NN digraph `nng`.
///
/// A vertex becomes a seed iff it is eligible, not yet excluded, and none of
/// its out-neighbors is excluded; selecting it excludes the vertex together
/// with all its out-neighbors. Ties between equal ordering scores always go
/// to the smaller point index.
///
/// `eligible` marks the vertices that may anchor a cluster; excluded or
/// ineligible vertices can still be swallowed as neighbors.
pub(crate) fn find_seeds(nng: &Digraph, method: SeedMethod, eligible: &[bool]) -> Result<Vec<PointIndex>> {
    debug_assert_eq!(eligible.len(), nng.num_vertices());
    ftlog::debug!(
        "finding seeds among {} vertices with {method:?}",
        eligible.iter().filter(|&&e| e).count()
    );

    let mut selection = Selection::new(nng);
    match method {
        SeedMethod::Lexical => {
            for v in 0..nng.num_vertices() {
                if eligible[v] {
                    selection.try_select(v as PointIndex);
                }
            }
        }
        SeedMethod::InwardsOrder => {
            let scores = in_degrees(nng);
            for v in sorted_by_score(&scores, eligible) {
                selection.try_select(v);
            }
        }
        SeedMethod::InwardsUpdating => {
            let scores = in_degrees(nng);
            selection.run_updating(scores, eligible, nng);
        }
        SeedMethod::ExclusionOrder => {
            let exclusion = exclusion_relation(nng)?;
            let scores = out_degrees(&exclusion);
            for v in sorted_by_score(&scores, eligible) {
                selection.try_select(v);
            }
        }
        SeedMethod::ExclusionUpdating => {
            let exclusion = exclusion_relation(nng)?;
            let scores = out_degrees(&exclusion);
            selection.run_updating(scores, eligible, &exclusion);
        }
    }

    ftlog::debug!("selected {} seeds", selection.seeds.len());
    Ok(selection.seeds)
}

/// The shared selection state: which vertices are excluded and the seeds
/// picked so far, in order.
struct Selection<'g> {
    /// The k-NN digraph seeds are selected from.
    nng: &'g Digraph,
    /// Vertices swallowed by a seed cluster, no longer admissible.
    excluded: Vec<bool>,
    /// The selected seeds, in selection order.
    seeds: Vec<PointIndex>,
}

impl<'g> Selection<'g> {
    fn new(nng: &'g Digraph) -> Self {
        Self {
            nng,
            excluded: vec![false; nng.num_vertices()],
            seeds: Vec::new(),
        }
    }

    /// Whether `v` may still become a seed.
    fn seedable(&self, v: PointIndex) -> bool {
        !self.excluded[v as usize]
            && self
                .nng
                .out_neighbors(v)
                .iter()
                .all(|&u| !self.excluded[u as usize])
    }

    /// Selects `v` if it is still seedable, returning the newly excluded
    /// vertices.
    fn try_select(&mut self, v: PointIndex) -> Vec<PointIndex> {
        if !self.seedable(v) {
            return Vec::new();
        }
        self.seeds.push(v);

        let mut newly_excluded = Vec::with_capacity(self.nng.out_degree(v) + 1);
        for &u in core::iter::once(&v).chain(self.nng.out_neighbors(v)) {
            if !self.excluded[u as usize] {
                self.excluded[u as usize] = true;
                newly_excluded.push(u);
            }
        }
        newly_excluded
    }

    /// Runs selection in ascending-score order where scores count arcs from
    /// non-excluded vertices in `score_graph`, re-sorting lazily as
    /// exclusions drive scores down.
    fn run_updating(&mut self, mut scores: Vec<ArcIndex>, eligible: &[bool], score_graph: &Digraph) {
        let mut heap = (0..self.nng.num_vertices())
            .filter(|&v| eligible[v])
            .map(|v| Reverse((scores[v], v as PointIndex)))
            .collect::<BinaryHeap<_>>();

        while let Some(Reverse((score, v))) = heap.pop() {
            if score != scores[v as usize] {
                // Stale entry; a fresher one is already in the heap.
                continue;
            }
            for u in self.try_select(v) {
                // `u` no longer counts towards the scores of the vertices
                // it points to.
                for &w in score_graph.out_neighbors(u) {
                    let w = w as usize;
                    if scores[w] > 0 {
                        scores[w] -= 1;
                        if eligible[w] && !self.excluded[w] {
                            heap.push(Reverse((scores[w], w as PointIndex)));
                        }
                    }
                }
            }
        }
    }
}

/// The in-degree of every vertex, self-loops included.
fn in_degrees(graph: &Digraph) -> Vec<ArcIndex> {
    let mut degrees = vec![0 as ArcIndex; graph.num_vertices()];
    for v in 0..graph.num_vertices() {
        for &u in graph.out_neighbors(v as PointIndex) {
            degrees[u as usize] += 1;
        }
    }
    degrees
}

/// The out-degree of every vertex.
fn out_degrees(graph: &Digraph) -> Vec<ArcIndex> {
    (0..graph.num_vertices())
        .map(|v| graph.out_degree(v as PointIndex) as ArcIndex)
        .collect()
}

/// The vertices eligible for seeding, sorted by ascending score with ties
/// by ascending index.
fn sorted_by_score(scores: &[ArcIndex], eligible: &[bool]) -> Vec<PointIndex> {
    let mut order = (0..scores.len())
        .filter(|&v| eligible[v])
        .map(|v| v as PointIndex)
        .collect::<Vec<_>>();
    order.sort_unstable_by_key(|&v| (scores[v as usize], v));
    order
}

/// Builds the symmetric exclusion relation of the k-NN digraph: an arc
/// `u -> v` iff selecting `u` as a seed bars `v` from seedhood, i.e. iff
/// `v` is an out-neighbor or in-neighbor of `u`, or shares an out-neighbor
/// with `u`. Self-arcs are omitted.
fn exclusion_relation(nng: &Digraph) -> Result<Digraph> {
    let transpose = nng.transpose();
    let num_vertices = nng.num_vertices();

    let mut stamp = vec![0 as ArcIndex; num_vertices];
    let mut row = Vec::new();
    let mut builder = DigraphBuilder::new(num_vertices);
    for v in 0..num_vertices {
        let round = v as ArcIndex + 1;
        stamp[v] = round; // Keep `v` itself out of its own row.

        row.clear();
        let out = nng.out_neighbors(v as PointIndex);
        let into = transpose.out_neighbors(v as PointIndex);
        let siblings = out.iter().flat_map(|&w| transpose.out_neighbors(w));
        for &u in out.iter().chain(into).chain(siblings) {
            if stamp[u as usize] != round {
                stamp[u as usize] = round;
                row.push(u);
            }
        }
        builder.row(row.iter().copied())?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ALL_METHODS: [SeedMethod; 5] = [
        SeedMethod::Lexical,
        SeedMethod::InwardsOrder,
        SeedMethod::InwardsUpdating,
        SeedMethod::ExclusionOrder,
        SeedMethod::ExclusionUpdating,
    ];

    /// Builds a digraph from explicit out-neighbor rows.
    fn graph_from_rows(rows: &[&[PointIndex]]) -> Digraph {
        let mut builder = DigraphBuilder::new(rows.len());
        for row in rows {
            if builder.row(row.iter().copied()).is_err() {
                unreachable!("test graphs fit the arc capacity");
            }
        }
        builder.finish()
    }

    /// A symmetric 3-cluster NNG: three pairs of mutual nearest neighbors,
    /// each vertex with a self-loop.
    fn three_pairs() -> Digraph {
        graph_from_rows(&[&[0, 1], &[1, 0], &[2, 3], &[3, 2], &[4, 5], &[5, 4]])
    }

    #[test_case(SeedMethod::Lexical ; "lexical")]
    #[test_case(SeedMethod::InwardsOrder ; "inwards order")]
    #[test_case(SeedMethod::InwardsUpdating ; "inwards updating")]
    #[test_case(SeedMethod::ExclusionOrder ; "exclusion order")]
    #[test_case(SeedMethod::ExclusionUpdating ; "exclusion updating")]
    fn arc_free_graphs_make_every_vertex_a_seed(method: SeedMethod) -> Result<()> {
        let graph = Digraph::empty(5);
        let seeds = find_seeds(&graph, method, &[true; 5])?;
        assert_eq!(seeds, vec![0, 1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn pairs_yield_one_seed_each() -> Result<()> {
        let graph = three_pairs();
        for method in ALL_METHODS {
            let seeds = find_seeds(&graph, method, &[true; 6])?;
            assert_eq!(seeds.len(), 3, "{method:?}");
            // One seed per mutual pair, lowest index first.
            assert_eq!(seeds, vec![0, 2, 4], "{method:?}");
        }
        Ok(())
    }

    #[test]
    fn ineligible_vertices_are_swallowed_but_never_seed() -> Result<()> {
        let graph = three_pairs();
        let mut eligible = [true; 6];
        eligible[0] = false;
        eligible[1] = false;

        for method in ALL_METHODS {
            let seeds = find_seeds(&graph, method, &eligible)?;
            assert_eq!(seeds, vec![2, 4], "{method:?}");
        }
        Ok(())
    }

    #[test]
    fn in_degree_order_prefers_fringe_vertices() -> Result<()> {
        // A hub graph where vertex 2 is everyone's nearest neighbor:
        //   0 -> {0, 2}, 1 -> {1, 2}, 2 -> {2, 1}, 3 -> {3, 2}
        // In-degrees: 0 -> 1, 1 -> 2, 2 -> 4, 3 -> 1.
        let graph = graph_from_rows(&[&[0, 2], &[1, 2], &[2, 1], &[3, 2]]);

        // Lexical picks 0 first, excluding {0, 2} and thereby blocking
        // everyone else.
        assert_eq!(find_seeds(&graph, SeedMethod::Lexical, &[true; 4])?, vec![0]);

        // Inwards order visits 0, 3, 1, 2: vertex 0 wins and blocks 1 and
        // 2, then 3 is blocked too because its neighbor 2 is excluded.
        assert_eq!(find_seeds(&graph, SeedMethod::InwardsOrder, &[true; 4])?, vec![0]);
        Ok(())
    }

    #[test]
    fn updating_scores_follow_exclusions() -> Result<()> {
        // Vertices 0 and 1 point into the pair {2, 3}; 4 and 5 are a
        // mutual pair of their own.
        //   0 -> {0, 2}, 1 -> {1, 3}, 2 -> {2, 3}, 3 -> {3, 2},
        //   4 -> {4, 5}, 5 -> {5, 4}
        let graph = graph_from_rows(&[&[0, 2], &[1, 3], &[2, 3], &[3, 2], &[4, 5], &[5, 4]]);

        // In-degrees are [1, 1, 3, 3, 2, 2], so the fringe vertices 0 and 1
        // seed before the pair {4, 5}.
        let seeds = find_seeds(&graph, SeedMethod::InwardsUpdating, &[true; 6])?;
        assert_seeds_are_valid(&graph, &seeds);
        assert_eq!(seeds, vec![0, 1, 4]);

        // Exclusion counts are [2, 2, 3, 3, 1, 1]: the isolated pair
        // blocks the fewest vertices and seeds first.
        let seeds = find_seeds(&graph, SeedMethod::ExclusionUpdating, &[true; 6])?;
        assert_seeds_are_valid(&graph, &seeds);
        assert_eq!(seeds, vec![4, 0, 1]);
        Ok(())
    }

    #[test]
    fn exclusion_relation_is_symmetric() -> Result<()> {
        let graph = graph_from_rows(&[&[0, 2], &[1, 2], &[2, 1], &[3, 2]]);
        let exclusion = exclusion_relation(&graph)?;
        for v in 0..4 {
            assert!(!exclusion.out_neighbors(v).contains(&v), "self-arc on {v}");
            for &u in exclusion.out_neighbors(v) {
                assert!(
                    exclusion.out_neighbors(u).contains(&v),
                    "arc {v} -> {u} has no mirror"
                );
            }
        }

        // 0 and 1 share the out-neighbor 2, so they exclude each other.
        assert!(exclusion.out_neighbors(0).contains(&1));
        assert!(exclusion.out_neighbors(1).contains(&0));
        Ok(())
    }

    /// Seeds must be pairwise non-adjacent: no seed may appear in another
    /// seed's out-neighborhood, and out-neighborhoods must not overlap.
    fn assert_seeds_are_valid(graph: &Digraph, seeds: &[PointIndex]) {
        let mut covered = vec![false; graph.num_vertices()];
        for &s in seeds {
            for &u in core::iter::once(&s).chain(graph.out_neighbors(s)) {
                assert!(!covered[u as usize], "seed {s} overlaps at {u}");
            }
            for &u in core::iter::once(&s).chain(graph.out_neighbors(s)) {
                covered[u as usize] = true;
            }
        }
    }

    #[test]
    fn maximality_holds_for_every_method() -> Result<()> {
        let graph = three_pairs();
        for method in ALL_METHODS {
            let seeds = find_seeds(&graph, method, &[true; 6])?;
            assert_seeds_are_valid(&graph, &seeds);

            // No unexcluded vertex with an unexcluded out-neighborhood may
            // remain.
            let mut excluded = vec![false; graph.num_vertices()];
            for &s in &seeds {
                excluded[s as usize] = true;
                for &u in graph.out_neighbors(s) {
                    excluded[u as usize] = true;
                }
            }
            for v in 0..graph.num_vertices() as PointIndex {
                let open = !excluded[v as usize]
                    && graph.out_neighbors(v).iter().all(|&u| !excluded[u as usize]);
                assert!(!open, "{method:?} left {v} seedable");
            }
        }
        Ok(())
    }

    #[test]
    fn codes_round_trip() {
        for method in ALL_METHODS {
            assert_eq!(SeedMethod::from_code(method.code()), Some(method));
        }
        assert_eq!(SeedMethod::from_code(5), None);
        assert_eq!(SeedMethod::Lexical.code(), 0);
        assert_eq!(SeedMethod::ExclusionUpdating.code(), 4);
    }
}
