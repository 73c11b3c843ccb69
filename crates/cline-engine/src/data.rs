//! The per-subpopulation evaluation cache.

use crate::interaction::Params;
use cline_core::{StrengthCallback, Subpopulation};
use cline_kdtree::KdTree;
use cline_space::PositionSnapshot;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Everything cached for one subpopulation between `evaluate()` and
/// `unevaluate()`.
///
/// The matrices are row-major N x N with the NaN-means-uncomputed
/// protocol: entry `(i, j)` of `strengths` is the strength exerted by `j`
/// on `i`, NaN until computed, 0 where sex segregation forbids the pair,
/// and 0 on the diagonal. `distances` holds Euclidean (minimum-image
/// under periodicity) distances under the same protocol.
///
/// Lifecycle: `unevaluate()` drops the position snapshot and the k-d tree
/// but keeps the matrix allocations; their contents become garbage, and
/// the next evaluation re-initializes them in place. The buffers can be
/// large, and reusing them avoids allocator churn between generations.
pub(crate) struct InteractionsData {
    /// False until `evaluate()` completes, and again after `unevaluate()`.
    pub evaluated: bool,
    /// N at evaluation time.
    pub individual_count: usize,
    /// Index of the first male at evaluation time.
    pub first_male_index: usize,
    /// Packed positions; `None` when not evaluated or non-spatial.
    pub snapshot: Option<PositionSnapshot>,
    /// Row-major pair distances. Empty until first needed.
    pub distances: Vec<f64>,
    /// Row-major pair strengths. Empty until first needed.
    pub strengths: Vec<f64>,
    /// The neighbor-search tree; built on first spatial neighbor query.
    pub tree: Option<KdTree>,
    /// The strength callbacks in effect at this evaluation.
    pub callbacks: Vec<Rc<dyn StrengthCallback>>,
}

impl InteractionsData {
    pub fn new() -> Self {
        Self {
            evaluated: false,
            individual_count: 0,
            first_male_index: 0,
            snapshot: None,
            distances: Vec::new(),
            strengths: Vec::new(),
            tree: None,
            callbacks: Vec::new(),
        }
    }

    /// Reset for a fresh evaluation of `subpop`.
    ///
    /// Retained matrix buffers are resized if the subpopulation changed
    /// size; their contents are garbage either way and are re-initialized
    /// before first use. The snapshot, tree, and callback snapshot from
    /// the previous evaluation are discarded.
    pub fn begin_evaluation(&mut self, subpop: &Subpopulation) {
        let n = subpop.len();
        if self.individual_count != n {
            let matrix_size = n * n;
            if !self.distances.is_empty() {
                self.distances.resize(matrix_size, f64::NAN);
            }
            if !self.strengths.is_empty() {
                self.strengths.resize(matrix_size, f64::NAN);
            }
            self.individual_count = n;
        }
        self.first_male_index = subpop.first_male_index;
        self.evaluated = false;
        self.snapshot = None;
        self.tree = None;
        self.callbacks.clear();
    }

    /// Mark every distance uncomputed and zero the diagonal.
    pub fn init_distances(&mut self) {
        for v in self.distances.iter_mut() {
            *v = f64::NAN;
        }
        let n = self.individual_count;
        for i in 0..n {
            self.distances[i * (n + 1)] = 0.0;
        }
    }

    /// Allocate and initialize the distance matrix if absent.
    pub fn ensure_distances(&mut self) {
        if self.distances.is_empty() && self.individual_count > 0 {
            let n = self.individual_count;
            self.distances.resize(n * n, f64::NAN);
            self.init_distances();
        }
    }

    /// Establish the NaN-vs-0 strength pattern.
    ///
    /// Without sex segregation every off-diagonal entry is NaN. With it,
    /// rows whose receiver the mask rejects are all 0, and within an
    /// admitted row the female and male column ranges are 0 or NaN
    /// according to the exerter mask. This pattern is not an optimization;
    /// it is how segregation works: a forbidden pair's 0 is never
    /// recomputed, so callbacks cannot influence it.
    pub fn init_strengths(&mut self, params: &Params) {
        let n = self.individual_count;
        let fmi = self.first_male_index;

        if params.sex_segregated() {
            for i in 0..n {
                let row = &mut self.strengths[i * n..(i + 1) * n];
                if !params.receiver_sex.admits(i, fmi) {
                    row.fill(0.0);
                    continue;
                }
                let (female_cols, male_cols) = row.split_at_mut(fmi.min(n));
                female_cols.fill(if params.exerter_sex.admits(0, fmi) {
                    f64::NAN
                } else {
                    0.0
                });
                male_cols.fill(if params.exerter_sex.admits(fmi, fmi) {
                    f64::NAN
                } else {
                    0.0
                });
            }
        } else {
            for v in self.strengths.iter_mut() {
                *v = f64::NAN;
            }
        }

        // Individuals exert no strength on themselves; zeroing the
        // diagonal here means no downstream path needs a self-pair check.
        for i in 0..n {
            self.strengths[i * (n + 1)] = 0.0;
        }
    }

    /// Allocate and initialize the strength matrix if absent.
    ///
    /// For spatial interactions the distance matrix is ensured first, so
    /// lazy strength computation always has a distance slot to consult.
    pub fn ensure_strengths(&mut self, params: &Params) {
        if params.spatiality.is_spatial() {
            self.ensure_distances();
        }
        if self.strengths.is_empty() && self.individual_count > 0 {
            let n = self.individual_count;
            self.strengths.resize(n * n, f64::NAN);
            self.init_strengths(params);
        }
    }

    /// Build the k-d tree if absent, returning whether a build happened.
    ///
    /// Requires an evaluated spatial interaction; the caller has checked
    /// both. The tree covers the snapshot replicated 3^p times for p
    /// periodic dimensions.
    pub fn ensure_tree(&mut self, params: &Params) -> bool {
        if self.tree.is_some() {
            return false;
        }
        let snapshot = self
            .snapshot
            .as_ref()
            .expect("spatial evaluation always captures a snapshot");
        let tree = KdTree::build(snapshot, params.periodic);
        debug_assert_eq!(tree.check_invariant(), tree.node_count());
        debug!(nodes = tree.node_count(), "k-d tree ready");
        self.tree = Some(tree);
        true
    }
}

impl fmt::Debug for InteractionsData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionsData")
            .field("evaluated", &self.evaluated)
            .field("individual_count", &self.individual_count)
            .field("first_male_index", &self.first_male_index)
            .field("snapshot", &self.snapshot.is_some())
            .field("distances_allocated", &!self.distances.is_empty())
            .field("strengths_allocated", &!self.strengths.is_empty())
            .field("tree", &self.tree.is_some())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::InteractionFunction;
    use cline_core::{SexSpec, SpatialBounds, SubpopId};
    use cline_space::Spatiality;

    fn params(receiver: SexSpec, exerter: SexSpec) -> Params {
        Params {
            spatiality: Spatiality::None,
            dims: 0,
            reciprocal: false,
            max_distance: f64::INFINITY,
            max_distance_sq: f64::INFINITY,
            receiver_sex: receiver,
            exerter_sex: exerter,
            periodic: [false; 3],
            periodic_enabled: false,
            function: InteractionFunction::default(),
        }
    }

    fn block(n: usize, first_male_index: usize) -> InteractionsData {
        let subpop = Subpopulation {
            id: SubpopId(1),
            first_male_index,
            bounds: SpatialBounds::cubic(1.0),
            individuals: vec![Default::default(); n],
        };
        let mut data = InteractionsData::new();
        data.begin_evaluation(&subpop);
        data
    }

    #[test]
    fn strength_mask_for_female_receiver_male_exerter() {
        let mut data = block(4, 2);
        data.strengths.resize(16, 0.0);
        data.init_strengths(&params(SexSpec::Female, SexSpec::Male));

        for i in 0..4 {
            for j in 0..4 {
                let v = data.strengths[i * 4 + j];
                if i < 2 && j >= 2 {
                    assert!(v.is_nan(), "({i}, {j}) should be uncomputed");
                } else {
                    assert_eq!(v, 0.0, "({i}, {j}) should be masked off");
                }
            }
        }
    }

    #[test]
    fn unsegregated_mask_is_nan_except_diagonal() {
        let mut data = block(3, 3);
        data.strengths.resize(9, 1.0);
        data.init_strengths(&params(SexSpec::Any, SexSpec::Any));

        for i in 0..3 {
            for j in 0..3 {
                let v = data.strengths[i * 3 + j];
                if i == j {
                    assert_eq!(v, 0.0);
                } else {
                    assert!(v.is_nan());
                }
            }
        }
    }

    #[test]
    fn begin_evaluation_resizes_retained_buffers() {
        let mut data = block(3, 3);
        data.ensure_distances();
        assert_eq!(data.distances.len(), 9);

        // Shrink to two individuals: the buffer follows.
        let smaller = Subpopulation {
            id: SubpopId(1),
            first_male_index: 2,
            bounds: SpatialBounds::cubic(1.0),
            individuals: vec![Default::default(); 2],
        };
        data.begin_evaluation(&smaller);
        assert_eq!(data.individual_count, 2);
        assert_eq!(data.distances.len(), 4);
        assert!(!data.evaluated);
    }
}
