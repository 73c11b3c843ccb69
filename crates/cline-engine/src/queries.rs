//! The pair, point, and neighbor query surface.
//!
//! Pair queries follow a one-to-many convention: of the two argument
//! lists exactly one must be a single individual, and `None` for the
//! second list means "against every individual in the subpopulation".
//! All queries are lazy: they consult the matrices, compute and memoize
//! what is missing, and leave every written entry valid even if the call
//! later fails.

use crate::aggregate::fill_neighbor_strengths;
use crate::data::InteractionsData;
use crate::interaction::{InteractionType, Params};
use cline_core::{QueryError, SubpopId, Subpopulation};
use indexmap::IndexMap;

/// Fetch the evaluated cache block for a subpopulation view.
///
/// A view whose size disagrees with the snapshot means the host mutated
/// the subpopulation after evaluating; that is reported as not evaluated.
pub(crate) fn lookup<'a>(
    data: &'a mut IndexMap<SubpopId, InteractionsData>,
    subpop: &Subpopulation,
) -> Result<&'a mut InteractionsData, QueryError> {
    match data.get_mut(&subpop.id) {
        Some(block) if block.evaluated && block.individual_count == subpop.len() => Ok(block),
        _ => Err(QueryError::NotEvaluated { subpop: subpop.id }),
    }
}

fn check_index(index: usize, count: usize) -> Result<(), QueryError> {
    if index >= count {
        return Err(QueryError::IndexOutOfRange { index, count });
    }
    Ok(())
}

fn check_indices(indices: &[usize], count: usize) -> Result<(), QueryError> {
    for &index in indices {
        check_index(index, count)?;
    }
    Ok(())
}

/// Resolve the one-to-many argument shape: returns the singleton focal
/// index and the other side (`None` = the whole subpopulation).
fn one_to_many<'a>(
    individuals1: &'a [usize],
    individuals2: Option<&'a [usize]>,
) -> Result<(usize, Option<&'a [usize]>), QueryError> {
    let count1 = individuals1.len();
    let count2 = individuals2.map_or(0, <[usize]>::len);
    if count1 != 1 && count2 != 1 {
        return Err(QueryError::NeitherSideSingleton { count1, count2 });
    }
    if count1 == 1 {
        Ok((individuals1[0], individuals2))
    } else {
        let focal = individuals2.expect("count2 == 1 implies a second list")[0];
        Ok((focal, Some(individuals1)))
    }
}

/// Pad a caller-supplied point into a packed three-slot buffer.
fn pack_point(point: &[f64], dims: usize) -> [f64; 3] {
    let mut packed = [0.0; 3];
    packed[..dims].copy_from_slice(&point[..dims]);
    packed
}

impl InteractionType {
    /// Pairwise distances, one-to-many.
    ///
    /// Exactly one of the two sides must be a single individual;
    /// `individuals2 = None` compares the focal individual against the
    /// whole subpopulation. Computed distances are memoized, mirrored
    /// when `reciprocal`.
    pub fn distance(
        &mut self,
        subpop: &Subpopulation,
        individuals1: &[usize],
        individuals2: Option<&[usize]>,
    ) -> Result<Vec<f64>, QueryError> {
        let params = self.params;
        if !params.spatiality.is_spatial() {
            return Err(QueryError::NotSpatial);
        }
        let (focal, others) = one_to_many(individuals1, individuals2)?;

        let data = lookup(&mut self.data, subpop)?;
        let n = data.individual_count;
        check_index(focal, n)?;
        data.ensure_distances();

        let InteractionsData {
            snapshot,
            distances,
            ..
        } = data;
        let snap = snapshot
            .as_ref()
            .expect("spatial evaluation always captures a snapshot");
        let mirror = params.reciprocal;

        let mut fetch = |j: usize| {
            let mut d = distances[focal * n + j];
            if d.is_nan() {
                d = params.pair_distance(snap, focal, j);
                distances[focal * n + j] = d;
                if mirror {
                    distances[j * n + focal] = d;
                }
            }
            d
        };

        match others {
            None => Ok((0..n).map(&mut fetch).collect()),
            Some(list) => {
                check_indices(list, n)?;
                Ok(list.iter().map(|&j| fetch(j)).collect())
            }
        }
    }

    /// Distances from each listed individual to an arbitrary point.
    ///
    /// The point must have exactly as many coordinates as the
    /// interaction's spatiality, and must lie inside the periodic bounds
    /// along every periodic dimension. Nothing is memoized; the point is
    /// not an individual.
    pub fn distance_to_point(
        &mut self,
        subpop: &Subpopulation,
        individuals: &[usize],
        point: &[f64],
    ) -> Result<Vec<f64>, QueryError> {
        let params = self.params;
        if !params.spatiality.is_spatial() {
            return Err(QueryError::NotSpatial);
        }
        if point.len() != params.dims {
            return Err(QueryError::PointLength {
                expected: params.dims,
                given: point.len(),
            });
        }

        let data = lookup(&mut self.data, subpop)?;
        let n = data.individual_count;
        check_indices(individuals, n)?;

        let snap = data
            .snapshot
            .as_ref()
            .expect("spatial evaluation always captures a snapshot");
        let packed = pack_point(point, params.dims);

        // A point outside the primary box has no well-defined wrapped
        // distance to anything.
        let axes = params.spatiality.axes();
        for (slot, &axis) in axes.iter().enumerate() {
            let bound = snap.bounds()[slot];
            if params.periodic[slot] && !(0.0..=bound).contains(&packed[slot]) {
                return Err(QueryError::OutOfPeriodicBounds {
                    axis,
                    coordinate: packed[slot],
                    bound,
                });
            }
        }

        Ok(individuals
            .iter()
            .map(|&i| params.point_distance(snap, i, &packed))
            .collect())
    }

    /// Pairwise interaction strengths, one-to-many.
    ///
    /// Shape rules as for [`distance`](Self::distance), but legal for
    /// non-spatial interactions too. Against the whole subpopulation
    /// (`individuals2 = None`) a local interaction takes a zero-fill plus
    /// tree-walk path; a non-local one computes the full row directly.
    pub fn strength(
        &mut self,
        subpop: &Subpopulation,
        individuals1: &[usize],
        individuals2: Option<&[usize]>,
    ) -> Result<Vec<f64>, QueryError> {
        let params = self.params;
        let (focal, others) = one_to_many(individuals1, individuals2)?;

        let data = lookup(&mut self.data, subpop)?;
        let n = data.individual_count;
        check_index(focal, n)?;
        data.ensure_strengths(&params);

        if params.spatiality.is_spatial() {
            match others {
                None if params.max_distance.is_finite() => {
                    // Local interaction: zero-fill, then let the tree walk
                    // write only the in-range strengths.
                    let built = data.ensure_tree(&params);
                    if built {
                        self.metrics.tree_builds += 1;
                    }
                    let mut result = vec![0.0; n];
                    fill_neighbor_strengths(
                        &params,
                        data,
                        subpop,
                        focal,
                        &mut result,
                        &mut self.metrics,
                    )?;
                    Ok(result)
                }
                None => {
                    // Non-local interaction: every pair is in range, so
                    // brute force over the row is the cheaper path.
                    let list: Vec<usize> = (0..n).collect();
                    self.strength_for_list(subpop, focal, &list)
                }
                Some(list) => {
                    check_indices(list, n)?;
                    self.strength_for_list(subpop, focal, list)
                }
            }
        } else {
            let mut computed = 0u64;
            let out = {
                let InteractionsData {
                    strengths,
                    callbacks,
                    ..
                } = data;
                let mirror = params.reciprocal;
                let mut fetch = |j: usize| -> Result<f64, QueryError> {
                    let mut s = strengths[focal * n + j];
                    if s.is_nan() {
                        computed += 1;
                        s = params.strength_kernel(f64::NAN, focal, j, subpop, callbacks)?;
                        strengths[focal * n + j] = s;
                        if mirror {
                            strengths[j * n + focal] = s;
                        }
                    }
                    Ok(s)
                };
                match others {
                    None => (0..n).map(&mut fetch).collect::<Result<Vec<_>, _>>(),
                    Some(list) => {
                        check_indices(list, n)?;
                        list.iter().map(|&j| fetch(j)).collect()
                    }
                }
            };
            self.metrics.strengths_computed += computed;
            out
        }
    }

    /// Lazy per-pair strengths for an explicit list of exerters.
    fn strength_for_list(
        &mut self,
        subpop: &Subpopulation,
        focal: usize,
        list: &[usize],
    ) -> Result<Vec<f64>, QueryError> {
        let params = self.params;
        let mut computed = 0u64;
        let out = {
            let data = lookup(&mut self.data, subpop)?;
            let n = data.individual_count;
            let InteractionsData {
                snapshot,
                distances,
                strengths,
                callbacks,
                ..
            } = data;
            let snap = snapshot
                .as_ref()
                .expect("spatial evaluation always captures a snapshot");
            let mirror = params.reciprocal;

            list.iter()
                .map(|&j| -> Result<f64, QueryError> {
                    let mut s = strengths[focal * n + j];
                    if s.is_nan() {
                        let mut d = distances[focal * n + j];
                        if d.is_nan() {
                            d = params.pair_distance(snap, focal, j);
                            distances[focal * n + j] = d;
                            if mirror {
                                distances[j * n + focal] = d;
                            }
                        }
                        s = if d <= params.max_distance {
                            computed += 1;
                            params.strength_kernel(d, focal, j, subpop, callbacks)?
                        } else {
                            0.0
                        };
                        strengths[focal * n + j] = s;
                        if mirror {
                            strengths[j * n + focal] = s;
                        }
                    }
                    Ok(s)
                })
                .collect()
        };
        self.metrics.strengths_computed += computed;
        out
    }

    /// The up-to-`count` nearest neighbors of an evaluated individual,
    /// within the maximum interaction distance.
    ///
    /// `count` is clamped to the subpopulation size. The focal individual
    /// is never its own neighbor. Results are unordered.
    pub fn nearest_neighbors(
        &mut self,
        subpop: &Subpopulation,
        focal: usize,
        count: usize,
    ) -> Result<Vec<usize>, QueryError> {
        let params = self.params;
        if !params.spatiality.is_spatial() {
            return Err(QueryError::NotSpatial);
        }
        let data = lookup(&mut self.data, subpop)?;
        let n = data.individual_count;
        check_index(focal, n)?;
        let count = count.min(n);
        if count == 0 {
            return Ok(Vec::new());
        }

        let built = data.ensure_tree(&params);
        if built {
            self.metrics.tree_builds += 1;
        }
        let snap = data
            .snapshot
            .as_ref()
            .expect("spatial evaluation always captures a snapshot");
        let point = snap.point(focal).to_vec();
        Ok(find_neighbors(params, data, &point, count, Some(focal)))
    }

    /// The up-to-`count` nearest neighbors of an arbitrary point.
    ///
    /// The point must supply at least as many coordinates as the
    /// spatiality; extra coordinates are ignored. No individual is
    /// excluded.
    pub fn nearest_neighbors_of_point(
        &mut self,
        subpop: &Subpopulation,
        point: &[f64],
        count: usize,
    ) -> Result<Vec<usize>, QueryError> {
        let params = self.params;
        if !params.spatiality.is_spatial() {
            return Err(QueryError::NotSpatial);
        }
        if point.len() < params.dims {
            return Err(QueryError::PointLength {
                expected: params.dims,
                given: point.len(),
            });
        }
        let data = lookup(&mut self.data, subpop)?;
        let n = data.individual_count;
        let count = count.min(n);
        if count == 0 {
            return Ok(Vec::new());
        }

        let built = data.ensure_tree(&params);
        if built {
            self.metrics.tree_builds += 1;
        }
        let packed = pack_point(point, params.dims);
        Ok(find_neighbors(params, data, &packed, count, None))
    }
}

/// Dispatch a neighbor search to the query flavor that fits `count`.
///
/// One neighbor takes the single-best descent (radius-filtered at the
/// top); `count` covering everyone takes the all-within-radius walk; in
/// between, the top-k roster search.
fn find_neighbors(
    params: Params,
    data: &InteractionsData,
    point: &[f64],
    count: usize,
    exclude: Option<usize>,
) -> Vec<usize> {
    let tree = data.tree.as_ref().expect("tree ensured by caller");
    let n = data.individual_count;

    if count == 1 {
        let best = tree.nearest(point, exclude);
        return best
            .filter(|hit| hit.dist_sq <= params.max_distance_sq)
            .map(|hit| vec![hit.individual])
            .unwrap_or_default();
    }

    if count >= n.saturating_sub(1) {
        let mut found = Vec::new();
        tree.visit_within(point, params.max_distance_sq, exclude, &mut |hit| {
            found.push(hit.individual)
        });
        return found;
    }

    tree.nearest_k(point, count, params.max_distance_sq, exclude)
        .into_iter()
        .map(|hit| hit.individual)
        .collect()
}
