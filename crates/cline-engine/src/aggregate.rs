//! Strength aggregation over k-d tree walks, and the weighted draw.
//!
//! All three services share one discipline: walk the tree with the
//! radius-pruned descent, and for every qualifying neighbor fetch the
//! cached pair strength, computing and memoizing it on first touch. A
//! visited hit is always the canonical periodic image: the engine keeps
//! `max_distance < bound / 2` on every periodic axis, so only the
//! minimum-image replicate can fall inside the search radius. That is
//! what makes the memoized distances trustworthy for later queries.

use crate::data::InteractionsData;
use crate::interaction::{InteractionType, Params};
use crate::metrics::InteractionMetrics;
use crate::queries::lookup;
use cline_core::{CallbackError, QueryError, Subpopulation};
use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::WeightedAliasIndex;

/// Draw counts above this take the alias-table path; below it, a
/// cumulative linear scan is cheaper than the table setup.
const ALIAS_DRAW_CROSSOVER: usize = 50;

/// Sum the strengths of every neighbor of `focal` within the maximum
/// interaction distance, memoizing as it goes.
///
/// Under periodicity a per-call visited buffer enforces that each
/// neighbor contributes exactly once, even though the tree holds 3^p
/// replicates per individual.
pub(crate) fn total_neighbor_strength(
    params: &Params,
    data: &mut InteractionsData,
    subpop: &Subpopulation,
    focal: usize,
    metrics: &mut InteractionMetrics,
) -> Result<f64, CallbackError> {
    let n = data.individual_count;
    let mirror = params.reciprocal;
    let mut visited = if params.periodic_enabled {
        vec![false; n]
    } else {
        Vec::new()
    };

    let InteractionsData {
        snapshot,
        distances,
        strengths,
        tree,
        callbacks,
        ..
    } = data;
    let snap = snapshot
        .as_ref()
        .expect("spatial evaluation always captures a snapshot");
    let tree = tree.as_ref().expect("tree ensured by caller");

    let mut total = 0.0;
    let mut computed = 0u64;
    let mut failure: Option<CallbackError> = None;

    tree.visit_within(
        snap.point(focal),
        params.max_distance_sq,
        Some(focal),
        &mut |hit| {
            if failure.is_some() {
                return;
            }
            let j = hit.individual;
            if params.periodic_enabled {
                if visited[j] {
                    return;
                }
                visited[j] = true;
            }

            let mut d = distances[focal * n + j];
            if d.is_nan() {
                // The hit is the canonical image, so this is the
                // minimum-image pair distance and safe to memoize.
                d = hit.dist_sq.sqrt();
                distances[focal * n + j] = d;
                if mirror {
                    distances[j * n + focal] = d;
                }
            }

            let mut s = strengths[focal * n + j];
            if s.is_nan() {
                computed += 1;
                match params.strength_kernel(d, focal, j, subpop, callbacks) {
                    Ok(v) => {
                        strengths[focal * n + j] = v;
                        if mirror {
                            strengths[j * n + focal] = v;
                        }
                        s = v;
                    }
                    Err(e) => {
                        failure = Some(e);
                        return;
                    }
                }
            }

            total += s;
        },
    );

    metrics.strengths_computed += computed;
    match failure {
        Some(e) => Err(e),
        None => Ok(total),
    }
}

/// Write the strength of every in-range neighbor of `focal` into
/// `result`, indexed by neighbor.
///
/// Entries for out-of-range individuals are left untouched (callers
/// zero-fill first). No visited buffer is needed: overwriting an entry
/// with the same memoized value is harmless.
pub(crate) fn fill_neighbor_strengths(
    params: &Params,
    data: &mut InteractionsData,
    subpop: &Subpopulation,
    focal: usize,
    result: &mut [f64],
    metrics: &mut InteractionMetrics,
) -> Result<(), QueryError> {
    let n = data.individual_count;
    let mirror = params.reciprocal;

    let InteractionsData {
        snapshot,
        distances,
        strengths,
        tree,
        callbacks,
        ..
    } = data;
    let snap = snapshot
        .as_ref()
        .expect("spatial evaluation always captures a snapshot");
    let tree = tree.as_ref().expect("tree ensured by caller");

    let mut computed = 0u64;
    let mut failure: Option<CallbackError> = None;

    tree.visit_within(
        snap.point(focal),
        params.max_distance_sq,
        Some(focal),
        &mut |hit| {
            if failure.is_some() {
                return;
            }
            let j = hit.individual;

            let mut d = distances[focal * n + j];
            if d.is_nan() {
                d = hit.dist_sq.sqrt();
                distances[focal * n + j] = d;
                if mirror {
                    distances[j * n + focal] = d;
                }
            }

            let mut s = strengths[focal * n + j];
            if s.is_nan() {
                computed += 1;
                match params.strength_kernel(d, focal, j, subpop, callbacks) {
                    Ok(v) => {
                        strengths[focal * n + j] = v;
                        if mirror {
                            strengths[j * n + focal] = v;
                        }
                        s = v;
                    }
                    Err(e) => {
                        failure = Some(e);
                        return;
                    }
                }
            }

            result[j] = s;
        },
    );

    metrics.strengths_computed += computed;
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

impl InteractionType {
    /// Sum of neighbor strengths for each listed individual.
    ///
    /// For spatial interactions the neighborhood is everyone within the
    /// maximum interaction distance, found through the k-d tree. For
    /// non-spatial interactions every other individual is a neighbor, so
    /// the total is the focal row's sum.
    pub fn total_of_neighbor_strengths(
        &mut self,
        subpop: &Subpopulation,
        individuals: &[usize],
    ) -> Result<Vec<f64>, QueryError> {
        let params = self.params;
        if !params.spatiality.is_spatial() {
            let mut totals = Vec::with_capacity(individuals.len());
            for &focal in individuals {
                let row = self.strength(subpop, &[focal], None)?;
                totals.push(row.iter().sum());
            }
            return Ok(totals);
        }

        let data = lookup(&mut self.data, subpop)?;
        let n = data.individual_count;
        for &focal in individuals {
            if focal >= n {
                return Err(QueryError::IndexOutOfRange {
                    index: focal,
                    count: n,
                });
            }
        }
        data.ensure_strengths(&params);
        let built = data.ensure_tree(&params);
        if built {
            self.metrics.tree_builds += 1;
        }

        let mut totals = Vec::with_capacity(individuals.len());
        for &focal in individuals {
            let total = total_neighbor_strength(&params, data, subpop, focal, &mut self.metrics)?;
            totals.push(total);
        }
        Ok(totals)
    }

    /// Draw `count` neighbors of `focal`, weighted by interaction
    /// strength, with replacement.
    ///
    /// For spatial interactions the candidate set is every neighbor
    /// within the maximum distance; for non-spatial ones it is the whole
    /// subpopulation (self-draws are impossible either way, since the
    /// self-strength is zero). An all-zero neighborhood yields an empty
    /// draw. Large counts use an alias-table preprocessor; small counts
    /// use a cumulative scan.
    pub fn draw_by_strength<R: Rng + ?Sized>(
        &mut self,
        subpop: &Subpopulation,
        focal: usize,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, QueryError> {
        let params = self.params;
        let data = lookup(&mut self.data, subpop)?;
        let n = data.individual_count;
        if focal >= n {
            return Err(QueryError::IndexOutOfRange {
                index: focal,
                count: n,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        data.ensure_strengths(&params);

        // Gather the candidate neighborhood.
        let neighbors: Vec<usize> = if params.spatiality.is_spatial() {
            let built = data.ensure_tree(&params);
            if built {
                self.metrics.tree_builds += 1;
            }
            let mut found = Vec::new();
            {
                let InteractionsData { snapshot, tree, .. } = &*data;
                let snap = snapshot
                    .as_ref()
                    .expect("spatial evaluation always captures a snapshot");
                let tree = tree.as_ref().expect("tree ensured above");
                tree.visit_within(
                    snap.point(focal),
                    params.max_distance_sq,
                    Some(focal),
                    &mut |hit| found.push(hit.individual),
                );
            }
            found
        } else {
            (0..n).collect()
        };

        // Fetch or compute each candidate's strength.
        let mut computed = 0u64;
        let mut weights = Vec::with_capacity(neighbors.len());
        let mut total = 0.0;
        {
            let spatial = params.spatiality.is_spatial();
            let mirror = params.reciprocal;
            let InteractionsData {
                snapshot,
                distances,
                strengths,
                callbacks,
                ..
            } = data;

            for &j in &neighbors {
                let mut s = strengths[focal * n + j];
                if s.is_nan() {
                    let d = if spatial {
                        let snap = snapshot
                            .as_ref()
                            .expect("spatial evaluation always captures a snapshot");
                        let mut d = distances[focal * n + j];
                        if d.is_nan() {
                            d = params.pair_distance(snap, focal, j);
                            distances[focal * n + j] = d;
                            if mirror {
                                distances[j * n + focal] = d;
                            }
                        }
                        d
                    } else {
                        f64::NAN
                    };
                    s = if !spatial || d <= params.max_distance {
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
                total += s;
                weights.push(s);
            }
        }
        self.metrics.strengths_computed += computed;

        if total <= 0.0 {
            return Ok(Vec::new());
        }

        let mut draws = Vec::with_capacity(count);
        let mut drew_with_alias = false;
        if count > ALIAS_DRAW_CROSSOVER {
            // Alias-table sampling amortizes its setup over many draws.
            if let Ok(alias) = WeightedAliasIndex::new(weights.clone()) {
                for _ in 0..count {
                    draws.push(neighbors[alias.sample(rng)]);
                }
                drew_with_alias = true;
            }
        }
        if !drew_with_alias {
            for _ in 0..count {
                let target = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut hit = neighbors.len() - 1;
                for (slot, &w) in weights.iter().enumerate() {
                    cumulative += w;
                    if target <= cumulative {
                        hit = slot;
                        break;
                    }
                }
                draws.push(neighbors[hit]);
            }
        }

        self.metrics.draws += count as u64;
        Ok(draws)
    }
}
