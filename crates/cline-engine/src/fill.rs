//! Eager all-pairs population of the distance and strength matrices.

use crate::data::InteractionsData;
use crate::interaction::Params;
use crate::metrics::InteractionMetrics;
use cline_core::{CallbackError, Subpopulation};

/// Fill both matrices for every pair, as `evaluate(immediate = true)`
/// requests.
///
/// On entry the matrices are either unallocated or allocated with
/// garbage contents. Without sex segregation every entry is overwritten,
/// so no initialization pass is needed; with segregation the NaN-vs-0
/// mask is established first and only NaN entries are computed, which is
/// what keeps forbidden pairs at 0. When `reciprocal`, only the upper
/// triangle is computed and each value is mirrored.
pub(crate) fn fill_all_pairs(
    params: &Params,
    data: &mut InteractionsData,
    subpop: &Subpopulation,
    metrics: &mut InteractionMetrics,
) -> Result<(), CallbackError> {
    let n = data.individual_count;
    if n == 0 {
        return Ok(());
    }
    let matrix_size = n * n;
    let segregated = params.sex_segregated();
    let spatial = params.spatiality.is_spatial();

    if spatial && data.distances.len() != matrix_size {
        data.distances.resize(matrix_size, f64::NAN);
    }
    if data.strengths.len() != matrix_size {
        data.strengths.resize(matrix_size, f64::NAN);
    }
    if segregated {
        data.init_strengths(params);
    }

    let InteractionsData {
        snapshot,
        distances,
        strengths,
        callbacks,
        ..
    } = data;

    if spatial {
        let snap = snapshot
            .as_ref()
            .expect("spatial evaluation always captures a snapshot");

        for i in 0..n {
            let j_start = if params.reciprocal { i } else { 0 };
            for j in j_start..n {
                if !segregated && i == j {
                    // Zero distance from self, zero strength on self.
                    distances[i * n + j] = 0.0;
                    strengths[i * n + j] = 0.0;
                    continue;
                }

                let distance = params.pair_distance(snap, i, j);
                distances[i * n + j] = distance;
                if params.reciprocal {
                    distances[j * n + i] = distance;
                }

                // Under segregation, non-NaN entries are the mask's 0s
                // (or the diagonal) and must stay untouched.
                if !strengths[i * n + j].is_nan() {
                    continue;
                }
                let strength = if distance <= params.max_distance {
                    metrics.strengths_computed += 1;
                    params.strength_kernel(distance, i, j, subpop, callbacks)?
                } else {
                    0.0
                };
                strengths[i * n + j] = strength;
                if params.reciprocal {
                    strengths[j * n + i] = strength;
                }
            }
        }
    } else {
        // Non-spatial interactions have no distances at all.
        for i in 0..n {
            let j_start = if params.reciprocal { i } else { 0 };
            for j in j_start..n {
                if !segregated && i == j {
                    strengths[i * n + j] = 0.0;
                    continue;
                }
                if !strengths[i * n + j].is_nan() {
                    continue;
                }
                metrics.strengths_computed += 1;
                let strength = params.strength_kernel(f64::NAN, i, j, subpop, callbacks)?;
                strengths[i * n + j] = strength;
                if params.reciprocal {
                    strengths[j * n + i] = strength;
                }
            }
        }
    }

    Ok(())
}
