//! Nearest-neighbor-graph clustering under hard minimum-size constraints.
//!
//! The pipeline builds a k-NN digraph over the seed candidates, selects a
//! maximal set of non-adjacent seeds, turns each seed and its neighbors
//! into a cluster, and finally assigns the remaining points. Every cluster
//! is guaranteed at least `size_constraint` members, and at least the
//! per-type minimums when type constraints are given.

mod assign;
mod batch;
mod seeds;

pub use assign::UnassignedMethod;
pub use seeds::SeedMethod;

use crate::graph::{Digraph, DigraphBuilder};
use crate::search::{DistanceSearch, NnSearch};
use crate::{ClusterLabel, Clustering, DataSet, Error, PointIndex, Result, TypeLabel, TYPE_MAX, UNASSIGNED};

/// The options of a nearest-neighbor-graph clustering run.
///
/// Start from [`NngParams::new`] with the size constraint and override the
/// rest as needed:
///
/// ```
/// use mincard::{NngParams, SeedMethod, UnassignedMethod};
///
/// let params = NngParams::new(3)
///     .with_seed_method(SeedMethod::InwardsOrder)
///     .with_secondary_unassigned_method(UnassignedMethod::ClosestSeed);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct NngParams<'p> {
    /// The minimum number of members of every cluster.
    size_constraint: usize,
    /// The order in which vertices are offered seedhood.
    seed_method: SeedMethod,
    /// The points that anchor and fill seed clusters; all points if absent.
    primary_points: Option<&'p [PointIndex]>,
    /// The points assigned after the primary pass; defaults to the
    /// complement of the primary points.
    secondary_points: Option<&'p [PointIndex]>,
    /// How leftover primary points are assigned.
    primary_unassigned_method: UnassignedMethod,
    /// How secondary points are assigned.
    secondary_unassigned_method: UnassignedMethod,
    /// Neighbors beyond this radius never enter the k-NN digraph.
    seed_radius: Option<f64>,
    /// The radius of the primary assignment pass.
    primary_radius: Option<f64>,
    /// The radius of the secondary assignment pass.
    secondary_radius: Option<f64>,
    /// Process seed candidates in windows of this size.
    batch_size: Option<usize>,
    /// One type label per point of the data set.
    type_labels: Option<&'p [TypeLabel]>,
    /// The minimum number of members of each type per cluster.
    type_minimums: Option<&'p [u32]>,
}

impl<'p> NngParams<'p> {
    /// Creates the default options for the given size constraint: lexical
    /// seeds, leftover primary points join a neighbor's cluster, secondary
    /// points stay unassigned, no radii, no batching, no type constraints.
    #[must_use]
    pub const fn new(size_constraint: usize) -> Self {
        Self {
            size_constraint,
            seed_method: SeedMethod::Lexical,
            primary_points: None,
            secondary_points: None,
            primary_unassigned_method: UnassignedMethod::AnyNeighbor,
            secondary_unassigned_method: UnassignedMethod::Ignore,
            seed_radius: None,
            primary_radius: None,
            secondary_radius: None,
            batch_size: None,
            type_labels: None,
            type_minimums: None,
        }
    }

    /// Sets the seed selection method.
    #[must_use]
    pub const fn with_seed_method(mut self, method: SeedMethod) -> Self {
        self.seed_method = method;
        self
    }

    /// Restricts seed candidates to the given points.
    #[must_use]
    pub const fn with_primary_points(mut self, points: &'p [PointIndex]) -> Self {
        self.primary_points = Some(points);
        self
    }

    /// Overrides the set of secondary points.
    #[must_use]
    pub const fn with_secondary_points(mut self, points: &'p [PointIndex]) -> Self {
        self.secondary_points = Some(points);
        self
    }

    /// Sets the assignment method for leftover primary points.
    #[must_use]
    pub const fn with_primary_unassigned_method(mut self, method: UnassignedMethod) -> Self {
        self.primary_unassigned_method = method;
        self
    }

    /// Sets the assignment method for secondary points.
    #[must_use]
    pub const fn with_secondary_unassigned_method(mut self, method: UnassignedMethod) -> Self {
        self.secondary_unassigned_method = method;
        self
    }

    /// Excludes neighbors beyond `radius` from the k-NN digraph.
    #[must_use]
    pub const fn with_seed_radius(mut self, radius: f64) -> Self {
        self.seed_radius = Some(radius);
        self
    }

    /// Sets the radius of the primary assignment pass.
    #[must_use]
    pub const fn with_primary_radius(mut self, radius: f64) -> Self {
        self.primary_radius = Some(radius);
        self
    }

    /// Sets the radius of the secondary assignment pass.
    #[must_use]
    pub const fn with_secondary_radius(mut self, radius: f64) -> Self {
        self.secondary_radius = Some(radius);
        self
    }

    /// Processes seed candidates in windows of `batch_size`, bounding the
    /// peak size of the nearest-neighbor structures. The resulting
    /// clustering satisfies the same size constraints as the non-batched
    /// pipeline but need not be identical to it.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Adds per-type minimums: every cluster must contain at least
    /// `type_minimums[t]` points of each type `t`. The size constraint
    /// remains the floor for the total cluster size.
    #[must_use]
    pub const fn with_types(mut self, type_labels: &'p [TypeLabel], type_minimums: &'p [u32]) -> Self {
        self.type_labels = Some(type_labels);
        self.type_minimums = Some(type_minimums);
        self
    }
}

/// Runs the nearest-neighbor-graph clustering pipeline and returns a fresh
/// clustering.
///
/// # Errors
///
/// - [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) for malformed options: a zero size
///   constraint, out-of-range or duplicated point subsets, a radius-less
///   [`UnassignedMethod::ClosestSeedRadius`], inconsistent type arrays.
/// - [`ErrorKind::NoSolution`](crate::ErrorKind::NoSolution) when the constraints cannot be met, e.g.
///   a candidate lacks `size_constraint` neighbors within the seed radius.
/// - [`ErrorKind::NotImplemented`](crate::ErrorKind::NotImplemented) for batched typed clustering.
/// - [`ErrorKind::DistSearchError`](crate::ErrorKind::DistSearchError) when the backend rejects the data
///   set.
pub fn sc_clustering(data: &DataSet, search: &dyn DistanceSearch, params: &NngParams) -> Result<Clustering<'static>> {
    let mut clustering = Clustering::new(data.num_points())?;
    sc_clustering_into(data, search, params, &mut clustering)?;
    Ok(clustering)
}

/// As [`sc_clustering`], but writes the result through an existing
/// clustering, e.g. one over a caller-owned label buffer.
///
/// On failure the clustering is left untouched.
///
/// # Errors
///
/// - See [`sc_clustering`]; additionally
///   [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if the clustering does not cover the
///   data set.
pub fn sc_clustering_into(
    data: &DataSet,
    search: &dyn DistanceSearch,
    params: &NngParams,
    clustering: &mut Clustering<'_>,
) -> Result<()> {
    let n = data.num_points();
    if clustering.num_points() != n {
        return Err(Error::invalid_input(format!(
            "the clustering covers {} points but the data set has {n}",
            clustering.num_points()
        )));
    }
    validate_params(data, search, params)?;
    ftlog::debug!(
        "clustering {n} points with size constraint {}",
        params.size_constraint
    );

    // The size constraint of one is trivially satisfied by singletons.
    if params.size_constraint == 1 {
        let labels = clustering.labels_mut();
        for (i, label) in labels.iter_mut().enumerate() {
            *label = i as ClusterLabel;
        }
        clustering.set_num_clusters(n);
        return Ok(());
    }

    let candidates = params
        .primary_points
        .map_or_else(|| (0..n as PointIndex).collect(), <[PointIndex]>::to_vec);
    let is_candidate = subset_bitmap(n, &candidates, "primary")?;

    // All fallible work happens against scratch labels so that the output
    // clustering stays untouched on failure.
    let mut labels = vec![UNASSIGNED; n];
    let num_clusters = if let Some(batch_size) = params.batch_size {
        batch::batch_pipeline(data, search, params, batch_size, &candidates, &is_candidate, &mut labels)?
    } else {
        standard_pipeline(data, search, params, &candidates, &is_candidate, &mut labels)?
    };

    clustering.labels_mut().copy_from_slice(&labels);
    clustering.set_num_clusters(num_clusters);
    clustering.renumber();
    ftlog::debug!("clustered into {} clusters", clustering.num_clusters());
    Ok(())
}

/// The non-batched pipeline: one k-NN digraph, one seed pass, two
/// assignment passes. Returns the number of clusters.
fn standard_pipeline(
    data: &DataSet,
    search: &dyn DistanceSearch,
    params: &NngParams,
    candidates: &[PointIndex],
    is_candidate: &[bool],
    labels: &mut [ClusterLabel],
) -> Result<usize> {
    let (nng, eligible) = match (params.type_labels, params.type_minimums) {
        (Some(type_labels), Some(minimums)) => build_typed_nng(
            data,
            search,
            candidates,
            is_candidate,
            params.size_constraint,
            params.seed_radius,
            type_labels,
            minimums,
        )?,
        _ => (
            build_nng(
                data,
                search,
                candidates,
                is_candidate,
                params.size_constraint,
                params.seed_radius,
            )?,
            is_candidate.to_vec(),
        ),
    };

    let seeds = seeds::find_seeds(&nng, params.seed_method, &eligible)?;
    if seeds.is_empty() {
        return Err(Error::no_solution(
            "no point can anchor a cluster under the given constraints",
        ));
    }

    for (c, &s) in seeds.iter().enumerate() {
        labels[s as usize] = c as ClusterLabel;
        for &u in nng.out_neighbors(s) {
            labels[u as usize] = c as ClusterLabel;
        }
    }
    ftlog::debug!("formed {} seed clusters", seeds.len());

    assign::assign_unassigned(
        data,
        search,
        labels,
        candidates,
        params.primary_unassigned_method,
        params.primary_radius,
        Some(&nng),
        &seeds,
    )?;

    let secondary = secondary_points(params, is_candidate);
    assign::assign_unassigned(
        data,
        search,
        labels,
        &secondary,
        params.secondary_unassigned_method,
        params.secondary_radius,
        Some(&nng),
        &seeds,
    )?;

    Ok(seeds.len())
}

/// Builds the k-NN digraph over the seed candidates: each candidate points
/// at itself and its `size_constraint - 1` nearest fellow candidates.
fn build_nng(
    data: &DataSet,
    search: &dyn DistanceSearch,
    candidates: &[PointIndex],
    is_candidate: &[bool],
    size_constraint: usize,
    seed_radius: Option<f64>,
) -> Result<Digraph> {
    let n = data.num_points();
    let mut nn = search.open_nn_search(data, size_constraint, seed_radius, candidates)?;

    let mut builder = DigraphBuilder::new(n);
    let mut row = Vec::with_capacity(size_constraint);
    for v in 0..n as PointIndex {
        if !is_candidate[v as usize] {
            builder.row([])?;
            continue;
        }
        let heads = nn.knn(v)?;
        if heads.len() < size_constraint {
            return Err(Error::no_solution(format!(
                "point {v} has only {} of the {size_constraint} required neighbors within the seed radius",
                heads.len()
            )));
        }
        row.clear();
        row.extend_from_slice(heads);
        ensure_self_arc(&mut row, v);
        builder.row(row.iter().copied())?;
    }
    Ok(builder.finish())
}

/// Builds the typed k-NN digraph: per-type nearest neighbors satisfying the
/// minimums, topped up from the overall nearest neighbors until the size
/// constraint is reached. Candidates that cannot meet the constraints get
/// no arcs and are reported ineligible instead of failing the run.
#[allow(clippy::too_many_arguments)]
fn build_typed_nng(
    data: &DataSet,
    search: &dyn DistanceSearch,
    candidates: &[PointIndex],
    is_candidate: &[bool],
    size_constraint: usize,
    seed_radius: Option<f64>,
    type_labels: &[TypeLabel],
    minimums: &[u32],
) -> Result<(Digraph, Vec<bool>)> {
    let n = data.num_points();

    let mut by_type = vec![Vec::new(); minimums.len()];
    for &c in candidates {
        by_type[type_labels[c as usize] as usize].push(c);
    }

    // One searcher per constrained type, restricted to candidates of that
    // type; a type with fewer candidates than its minimum can never be
    // satisfied.
    let mut typed_nn = Vec::with_capacity(minimums.len());
    for (t, &minimum) in minimums.iter().enumerate() {
        if minimum == 0 {
            typed_nn.push(None);
            continue;
        }
        if by_type[t].len() < minimum as usize {
            return Err(Error::no_solution(format!(
                "type {t} has {} candidates but every cluster needs {minimum}",
                by_type[t].len()
            )));
        }
        typed_nn.push(Some(search.open_nn_search(
            data,
            minimum as usize,
            seed_radius,
            &by_type[t],
        )?));
    }
    let mut overall_nn = search.open_nn_search(data, size_constraint, seed_radius, candidates)?;

    let mut builder = DigraphBuilder::new(n);
    let mut eligible = vec![false; n];
    let mut row = Vec::with_capacity(size_constraint);
    let mut seen = vec![false; n];
    for v in 0..n as PointIndex {
        if !is_candidate[v as usize] {
            builder.row([])?;
            continue;
        }

        row.clear();
        row.push(v);
        seen[v as usize] = true;

        let mut satisfied = true;
        for nn in typed_nn.iter_mut().flatten() {
            let needed = nn.k();
            let heads = nn.knn(v)?;
            if heads.len() < needed {
                satisfied = false;
                break;
            }
            for &h in heads {
                if !seen[h as usize] {
                    seen[h as usize] = true;
                    row.push(h);
                }
            }
        }

        // Top up with unconstrained neighbors to reach the size constraint.
        if satisfied && row.len() < size_constraint {
            for &h in overall_nn.knn(v)? {
                if row.len() >= size_constraint {
                    break;
                }
                if !seen[h as usize] {
                    seen[h as usize] = true;
                    row.push(h);
                }
            }
            satisfied = row.len() >= size_constraint;
        }

        for &h in &row {
            seen[h as usize] = false;
        }
        if satisfied {
            eligible[v as usize] = true;
            builder.row(row.iter().copied())?;
        } else {
            builder.row([])?;
        }
    }
    Ok((builder.finish(), eligible))
}

/// Guarantees that `v` appears in its own adjacency row, displacing the
/// farthest neighbor if duplicate coordinates pushed it out.
fn ensure_self_arc(row: &mut Vec<PointIndex>, v: PointIndex) {
    if !row.contains(&v) {
        row.pop();
        row.push(v);
    }
}

/// The points of the secondary assignment pass: the explicit set if given,
/// otherwise the complement of the primary points.
fn secondary_points(params: &NngParams, is_candidate: &[bool]) -> Vec<PointIndex> {
    params.secondary_points.map_or_else(
        || {
            if params.primary_points.is_some() {
                (0..is_candidate.len() as PointIndex)
                    .filter(|&p| !is_candidate[p as usize])
                    .collect()
            } else {
                Vec::new()
            }
        },
        <[PointIndex]>::to_vec,
    )
}

/// Validates a point subset and returns its membership bitmap.
fn subset_bitmap(n: usize, points: &[PointIndex], what: &str) -> Result<Vec<bool>> {
    if points.is_empty() {
        return Err(Error::invalid_input(format!("the {what} point set is empty")));
    }
    let mut in_set = vec![false; n];
    for &p in points {
        if (p as usize) >= n {
            return Err(Error::invalid_input(format!(
                "{what} point {p} is outside the data set of {n} points"
            )));
        }
        if in_set[p as usize] {
            return Err(Error::invalid_input(format!(
                "{what} point {p} appears twice"
            )));
        }
        in_set[p as usize] = true;
    }
    Ok(in_set)
}

/// Validates the run options against the data set and backend.
fn validate_params(data: &DataSet, search: &dyn DistanceSearch, params: &NngParams) -> Result<()> {
    let n = data.num_points();
    if params.size_constraint == 0 {
        return Err(Error::invalid_input("the size constraint must be at least 1"));
    }
    if params.size_constraint > n {
        return Err(Error::no_solution(format!(
            "the size constraint {} exceeds the {n} points of the data set",
            params.size_constraint
        )));
    }
    if !search.check(data) {
        return Err(Error::DistSearch(
            "the distance-search backend cannot serve this data set".to_string(),
        ));
    }

    if let Some(primary) = params.primary_points {
        subset_bitmap(n, primary, "primary")?;
    }
    if let Some(secondary) = params.secondary_points {
        let bitmap = subset_bitmap(n, secondary, "secondary")?;
        if let Some(primary) = params.primary_points {
            if let Some(&shared) = primary.iter().find(|&&p| bitmap[p as usize]) {
                return Err(Error::invalid_input(format!(
                    "point {shared} is both a primary and a secondary point"
                )));
            }
        }
    }

    if params.primary_unassigned_method == UnassignedMethod::ClosestSeedRadius && params.primary_radius.is_none() {
        return Err(Error::invalid_input(
            "the primary assignment method needs a primary radius",
        ));
    }
    if params.secondary_unassigned_method == UnassignedMethod::ClosestSeedRadius && params.secondary_radius.is_none() {
        return Err(Error::invalid_input(
            "the secondary assignment method needs a secondary radius",
        ));
    }
    if let Some(batch_size) = params.batch_size {
        if batch_size == 0 {
            return Err(Error::invalid_input("the batch size must be at least 1"));
        }
    }

    match (params.type_labels, params.type_minimums) {
        (None, None) => {}
        (Some(type_labels), Some(minimums)) => {
            if params.batch_size.is_some() {
                return Err(Error::NotImplemented(
                    "batched clustering does not support type constraints".to_string(),
                ));
            }
            if type_labels.len() != n {
                return Err(Error::invalid_input(format!(
                    "expected {n} type labels, got {}",
                    type_labels.len()
                )));
            }
            if minimums.is_empty() || minimums.len() > TYPE_MAX {
                return Err(Error::invalid_input(format!(
                    "the number of types must be in [1, {TYPE_MAX}], got {}",
                    minimums.len()
                )));
            }
            if let Some(&bad) = type_labels.iter().find(|&&t| (t as usize) >= minimums.len()) {
                return Err(Error::invalid_input(format!(
                    "type label {bad} is outside the {} declared types",
                    minimums.len()
                )));
            }
            let total: u64 = minimums.iter().map(|&m| u64::from(m)).sum();
            if total > params.size_constraint as u64 {
                return Err(Error::invalid_input(format!(
                    "the type minimums sum to {total}, above the size constraint {}",
                    params.size_constraint
                )));
            }
        }
        _ => {
            return Err(Error::invalid_input(
                "type labels and type minimums must be given together",
            ));
        }
    }

    Ok(())
}
