//! The `InteractionType`: configuration plus the per-subpopulation
//! evaluation lifecycle.

use crate::data::InteractionsData;
use crate::fill::fill_all_pairs;
use crate::function::InteractionFunction;
use crate::metrics::InteractionMetrics;
use cline_core::{
    CallbackContext, CallbackError, ConfigError, EvaluateError, SexSpec, StrengthCallback,
    SubpopId, Subpopulation,
};
use cline_space::{euclidean, minimum_image, Periodicity, PositionSnapshot, Spatiality};
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

// ── InteractionConfig ──────────────────────────────────────────────

/// Construction-time configuration of an [`InteractionType`].
///
/// Periodicity is inherited from the host simulation's spatial
/// configuration and is constant for the life of the interaction type.
#[derive(Clone, Copy, Debug)]
pub struct InteractionConfig {
    /// Which universe axes participate in distances.
    pub spatiality: Spatiality,
    /// Whether strength(i, j) = strength(j, i) may be assumed for
    /// mirroring. Forced off when the sex masks differ.
    pub reciprocal: bool,
    /// Cutoff beyond which strength is 0. May be infinite.
    pub max_distance: f64,
    /// Sex mask for the receiving side.
    pub receiver_sex: SexSpec,
    /// Sex mask for the exerting side.
    pub exerter_sex: SexSpec,
    /// The universe's periodic axes.
    pub periodicity: Periodicity,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            spatiality: Spatiality::None,
            reciprocal: true,
            max_distance: f64::INFINITY,
            receiver_sex: SexSpec::Any,
            exerter_sex: SexSpec::Any,
            periodicity: Periodicity::NONE,
        }
    }
}

impl InteractionConfig {
    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. max_distance must be a non-negative number (may be +inf).
        if self.max_distance.is_nan() || self.max_distance < 0.0 {
            return Err(ConfigError::InvalidMaxDistance {
                value: self.max_distance,
            });
        }
        Ok(())
    }
}

// ── Params ─────────────────────────────────────────────────────────

/// The resolved, copyable view of an interaction type's configuration.
///
/// Query paths copy this out of `self` before mutably borrowing a cache
/// block, so kernels never need to re-borrow the interaction type.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Params {
    pub spatiality: Spatiality,
    pub dims: usize,
    pub reciprocal: bool,
    pub max_distance: f64,
    pub max_distance_sq: f64,
    pub receiver_sex: SexSpec,
    pub exerter_sex: SexSpec,
    /// Periodicity projected onto packed dimension slots.
    pub periodic: [bool; 3],
    pub periodic_enabled: bool,
    pub function: InteractionFunction,
}

impl Params {
    pub fn sex_segregated(&self) -> bool {
        self.receiver_sex != SexSpec::Any || self.exerter_sex != SexSpec::Any
    }

    /// Pair distance between two snapshot slots: minimum-image when any
    /// dimension wraps, plain Euclidean otherwise.
    #[inline]
    pub fn pair_distance(&self, snapshot: &PositionSnapshot, i: usize, j: usize) -> f64 {
        self.point_distance(snapshot, i, snapshot.point(j))
    }

    /// Distance from a snapshot slot to an arbitrary packed point.
    #[inline]
    pub fn point_distance(&self, snapshot: &PositionSnapshot, i: usize, point: &[f64]) -> f64 {
        if self.periodic_enabled {
            minimum_image(
                snapshot.point(i),
                point,
                self.dims,
                self.periodic,
                snapshot.bounds(),
            )
        } else {
            euclidean(snapshot.point(i), point, self.dims)
        }
    }

    /// The strength kernel: base interaction function, then the callback
    /// chain.
    ///
    /// Callers must ensure `distance <= max_distance` (or NaN for
    /// non-spatial interactions) before calling; self-pairs never reach
    /// this kernel because matrix initialization zeroes diagonals.
    /// Callbacks chain left-to-right; a constant-expression callback is
    /// folded without invocation. Every link's result must be finite and
    /// non-negative.
    pub fn strength_kernel(
        &self,
        distance: f64,
        receiver: usize,
        exerter: usize,
        subpop: &Subpopulation,
        callbacks: &[Rc<dyn StrengthCallback>],
    ) -> Result<f64, CallbackError> {
        let mut strength = self.function.value_at(distance, self.max_distance);

        for callback in callbacks {
            strength = match callback.constant_value() {
                Some(constant) => constant,
                None => {
                    let ctx = CallbackContext {
                        distance,
                        strength,
                        receiver,
                        exerter,
                        subpop: subpop.id,
                        individuals: &subpop.individuals,
                    };
                    callback.modify(&ctx)
                }
            };
            if !strength.is_finite() || strength < 0.0 {
                return Err(CallbackError {
                    callback: callback.name().to_string(),
                    value: strength,
                });
            }
        }

        Ok(strength)
    }
}

// ── InteractionType ────────────────────────────────────────────────

/// The spatial interaction engine for one configured interaction.
///
/// Owns every per-subpopulation evaluation cache, keyed by subpopulation
/// id. The host calls [`evaluate`](Self::evaluate) once per generation,
/// queries lazily, and calls [`unevaluate`](Self::unevaluate) at the
/// generation boundary. Individuals stay host-owned throughout; the
/// engine sees them only through [`Subpopulation`] views and refers to
/// them by subpopulation-local index.
///
/// Single-threaded by design: queries memoize into shared matrices and
/// there are no internal locks.
pub struct InteractionType {
    pub(crate) params: Params,
    periodicity: Periodicity,
    callbacks: Vec<Rc<dyn StrengthCallback>>,
    pub(crate) data: IndexMap<SubpopId, InteractionsData>,
    pub(crate) metrics: InteractionMetrics,
    offspring_generation: bool,
}

impl InteractionType {
    /// Construct from a validated configuration.
    ///
    /// The interaction function defaults to `Fixed { strength: 1.0 }`;
    /// reconfigure it with
    /// [`set_interaction_function`](Self::set_interaction_function).
    /// `reciprocal` is forced off when the receiver and exerter sex masks
    /// differ, because the two sides then draw from different individual
    /// sets.
    pub fn new(config: InteractionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let reciprocal = config.reciprocal && config.receiver_sex == config.exerter_sex;
        let periodic = config.periodicity.packed(config.spatiality);

        Ok(Self {
            params: Params {
                spatiality: config.spatiality,
                dims: config.spatiality.dimensions(),
                reciprocal,
                max_distance: config.max_distance,
                max_distance_sq: config.max_distance * config.max_distance,
                receiver_sex: config.receiver_sex,
                exerter_sex: config.exerter_sex,
                periodic,
                periodic_enabled: periodic.iter().any(|p| *p),
                function: InteractionFunction::default(),
            },
            periodicity: config.periodicity,
            callbacks: Vec::new(),
            data: IndexMap::new(),
            metrics: InteractionMetrics::default(),
            offspring_generation: false,
        })
    }

    /// The configured spatiality.
    pub fn spatiality(&self) -> Spatiality {
        self.params.spatiality
    }

    /// The maximum interaction distance.
    pub fn max_distance(&self) -> f64 {
        self.params.max_distance
    }

    /// Whether strengths are mirrored across the diagonal.
    pub fn reciprocal(&self) -> bool {
        self.params.reciprocal
    }

    /// The interaction function currently in effect.
    pub fn function(&self) -> InteractionFunction {
        self.params.function
    }

    /// The sex mask as a two-character receiver/exerter code, `"**"`,
    /// `"FM"`, and so on.
    pub fn sex_segregation(&self) -> String {
        format!("{}{}", self.params.receiver_sex, self.params.exerter_sex)
    }

    /// Engine activity counters.
    pub fn metrics(&self) -> &InteractionMetrics {
        &self.metrics
    }

    /// Register a strength callback. Takes effect at the next
    /// `evaluate()`; evaluations in flight keep the snapshot they took.
    pub fn register_callback(&mut self, callback: Rc<dyn StrengthCallback>) {
        self.callbacks.push(callback);
    }

    /// Remove all registered callbacks. Takes effect at the next
    /// `evaluate()`.
    pub fn clear_callbacks(&mut self) {
        self.callbacks.clear();
    }

    /// Tell the engine whether the host is inside offspring generation.
    /// While set, `evaluate()` is refused.
    pub fn set_offspring_generation(&mut self, active: bool) {
        self.offspring_generation = active;
    }

    /// Whether at least one subpopulation is currently evaluated.
    pub fn any_evaluated(&self) -> bool {
        self.data.values().any(|d| d.evaluated)
    }

    /// Whether the given subpopulation is currently evaluated.
    pub fn is_evaluated(&self, subpop: SubpopId) -> bool {
        self.data.get(&subpop).is_some_and(|d| d.evaluated)
    }

    /// Change the maximum interaction distance.
    ///
    /// Refused while any subpopulation is evaluated, and refused for a
    /// non-finite value while a linear interaction function is in effect.
    pub fn set_max_distance(&mut self, max_distance: f64) -> Result<(), ConfigError> {
        if self.any_evaluated() {
            return Err(ConfigError::InFlightChange);
        }
        if max_distance.is_nan() || max_distance < 0.0 {
            return Err(ConfigError::InvalidMaxDistance {
                value: max_distance,
            });
        }
        if matches!(self.params.function, InteractionFunction::Linear { .. })
            && !(max_distance.is_finite() && max_distance > 0.0)
        {
            return Err(ConfigError::LinearRequiresFiniteMaxDistance { max_distance });
        }
        self.params.max_distance = max_distance;
        self.params.max_distance_sq = max_distance * max_distance;
        Ok(())
    }

    /// Change the interaction function.
    ///
    /// Refused while any subpopulation is evaluated. Non-spatial
    /// interactions admit only `Fixed`; `Linear` requires a finite
    /// positive maximum distance to be in effect.
    pub fn set_interaction_function(
        &mut self,
        function: InteractionFunction,
    ) -> Result<(), ConfigError> {
        if self.any_evaluated() {
            return Err(ConfigError::InFlightChange);
        }
        if !self.params.spatiality.is_spatial()
            && !matches!(function, InteractionFunction::Fixed { .. })
        {
            return Err(ConfigError::NonSpatialRequiresFixed);
        }
        if matches!(function, InteractionFunction::Linear { .. })
            && !(self.params.max_distance.is_finite() && self.params.max_distance > 0.0)
        {
            return Err(ConfigError::LinearRequiresFiniteMaxDistance {
                max_distance: self.params.max_distance,
            });
        }
        self.params.function = function;
        Ok(())
    }

    /// Evaluate the given subpopulations: snapshot positions, record the
    /// active callback set, and (for `immediate`) eagerly fill the full
    /// matrices.
    ///
    /// Refused during offspring generation. A subpopulation that fails
    /// evaluation (out-of-bounds position, periodic extent too small for
    /// `max_distance`, callback failure during an eager fill) is left
    /// unevaluated; earlier subpopulations in the same call keep their
    /// completed evaluations.
    pub fn evaluate<'a>(
        &mut self,
        subpops: impl IntoIterator<Item = &'a Subpopulation>,
        immediate: bool,
    ) -> Result<(), EvaluateError> {
        if self.offspring_generation {
            return Err(EvaluateError::DuringOffspringGeneration);
        }

        for subpop in subpops {
            self.evaluate_subpopulation(subpop, immediate)?;
        }
        Ok(())
    }

    fn evaluate_subpopulation(
        &mut self,
        subpop: &Subpopulation,
        immediate: bool,
    ) -> Result<(), EvaluateError> {
        let params = self.params;
        let data = self
            .data
            .entry(subpop.id)
            .or_insert_with(InteractionsData::new);

        data.begin_evaluation(subpop);

        if params.spatiality.is_spatial() {
            let snapshot = PositionSnapshot::capture(params.spatiality, self.periodicity, subpop)?;

            // A periodic extent must exceed twice the interaction radius,
            // or one pair could interact through more than one image.
            let axes = params.spatiality.axes();
            for (slot, &axis) in axes.iter().enumerate() {
                if params.periodic[slot] && snapshot.bounds()[slot] <= params.max_distance * 2.0 {
                    return Err(EvaluateError::MaxDistanceExceedsPeriodicBounds {
                        axis,
                        bound: snapshot.bounds()[slot],
                        max_distance: params.max_distance,
                    });
                }
            }

            data.snapshot = Some(snapshot);
        }

        data.callbacks = self.callbacks.clone();
        data.evaluated = true;

        if immediate {
            if let Err(e) = fill_all_pairs(&params, data, subpop, &mut self.metrics) {
                data.evaluated = false;
                return Err(e.into());
            }
        } else {
            // Retained buffers hold garbage from the previous generation;
            // re-establish the lazy-fill pattern before any query reads.
            if !data.distances.is_empty() {
                data.init_distances();
            }
            if !data.strengths.is_empty() {
                data.init_strengths(&params);
            }
        }

        self.metrics.evaluations += 1;
        if immediate {
            self.metrics.immediate_fills += 1;
        }

        debug!(subpop = %subpop.id, size = subpop.len(), immediate, "evaluated");
        Ok(())
    }

    /// Invalidate every evaluation.
    ///
    /// Frees the position snapshots and k-d trees; retains the raw
    /// distance/strength buffers to amortize allocation across
    /// generations (their contents become garbage).
    pub fn unevaluate(&mut self) {
        for data in self.data.values_mut() {
            data.evaluated = false;
            data.snapshot = None;
            data.tree = None;
            data.callbacks.clear();
        }
        self.metrics.invalidations += 1;
        debug!("unevaluated all subpopulations");
    }
}

impl std::fmt::Debug for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionType")
            .field("spatiality", &self.params.spatiality)
            .field("reciprocal", &self.params.reciprocal)
            .field("max_distance", &self.params.max_distance)
            .field("sex_segregation", &self.sex_segregation())
            .field("function", &self.params.function)
            .field("callbacks", &self.callbacks.len())
            .field("subpops", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cline_core::{Individual, QueryError, SpatialBounds};

    fn subpop(id: u32, xs: &[f64]) -> Subpopulation {
        Subpopulation {
            id: SubpopId(id),
            first_male_index: xs.len(),
            bounds: SpatialBounds::cubic(10.0),
            individuals: xs.iter().map(|&x| Individual::at(x, 0.0, 0.0)).collect(),
        }
    }

    fn spatial_config() -> InteractionConfig {
        InteractionConfig {
            spatiality: Spatiality::X,
            max_distance: 2.0,
            ..InteractionConfig::default()
        }
    }

    #[test]
    fn new_rejects_nan_max_distance() {
        let config = InteractionConfig {
            max_distance: f64::NAN,
            ..InteractionConfig::default()
        };
        match InteractionType::new(config) {
            Err(ConfigError::InvalidMaxDistance { .. }) => {}
            other => panic!("expected InvalidMaxDistance, got {other:?}"),
        }
    }

    #[test]
    fn differing_sex_masks_force_reciprocal_off() {
        let config = InteractionConfig {
            reciprocal: true,
            receiver_sex: SexSpec::Female,
            exerter_sex: SexSpec::Male,
            ..InteractionConfig::default()
        };
        let it = InteractionType::new(config).unwrap();
        assert!(!it.reciprocal());
        assert_eq!(it.sex_segregation(), "FM");
    }

    #[test]
    fn non_spatial_rejects_non_fixed_function() {
        let mut it = InteractionType::new(InteractionConfig::default()).unwrap();
        match it.set_interaction_function(InteractionFunction::Exponential {
            strength: 1.0,
            rate: 1.0,
        }) {
            Err(ConfigError::NonSpatialRequiresFixed) => {}
            other => panic!("expected NonSpatialRequiresFixed, got {other:?}"),
        }
    }

    #[test]
    fn linear_requires_finite_max_distance() {
        let mut it = InteractionType::new(InteractionConfig {
            spatiality: Spatiality::X,
            ..InteractionConfig::default()
        })
        .unwrap();
        match it.set_interaction_function(InteractionFunction::Linear { strength: 1.0 }) {
            Err(ConfigError::LinearRequiresFiniteMaxDistance { .. }) => {}
            other => panic!("expected LinearRequiresFiniteMaxDistance, got {other:?}"),
        }

        // And the other direction: an in-effect linear function pins
        // max_distance to finite values.
        let mut it = InteractionType::new(spatial_config()).unwrap();
        it.set_interaction_function(InteractionFunction::Linear { strength: 1.0 })
            .unwrap();
        match it.set_max_distance(f64::INFINITY) {
            Err(ConfigError::LinearRequiresFiniteMaxDistance { .. }) => {}
            other => panic!("expected LinearRequiresFiniteMaxDistance, got {other:?}"),
        }
    }

    #[test]
    fn setters_refuse_in_flight_changes() {
        let mut it = InteractionType::new(spatial_config()).unwrap();
        let sp = subpop(1, &[0.0, 1.0]);
        it.evaluate([&sp], false).unwrap();
        assert!(it.any_evaluated());

        match it.set_max_distance(3.0) {
            Err(ConfigError::InFlightChange) => {}
            other => panic!("expected InFlightChange, got {other:?}"),
        }
        match it.set_interaction_function(InteractionFunction::Fixed { strength: 2.0 }) {
            Err(ConfigError::InFlightChange) => {}
            other => panic!("expected InFlightChange, got {other:?}"),
        }

        it.unevaluate();
        assert!(!it.any_evaluated());
        it.set_max_distance(3.0).unwrap();
    }

    #[test]
    fn evaluate_refused_during_offspring_generation() {
        let mut it = InteractionType::new(spatial_config()).unwrap();
        let sp = subpop(1, &[0.0, 1.0]);
        it.set_offspring_generation(true);
        match it.evaluate([&sp], false) {
            Err(EvaluateError::DuringOffspringGeneration) => {}
            other => panic!("expected DuringOffspringGeneration, got {other:?}"),
        }
        it.set_offspring_generation(false);
        it.evaluate([&sp], false).unwrap();
    }

    #[test]
    fn queries_before_evaluate_report_not_evaluated() {
        let mut it = InteractionType::new(spatial_config()).unwrap();
        let sp = subpop(1, &[0.0, 1.0]);
        match it.distance(&sp, &[0], None) {
            Err(QueryError::NotEvaluated { subpop }) => assert_eq!(subpop, SubpopId(1)),
            other => panic!("expected NotEvaluated, got {other:?}"),
        }
    }

    #[test]
    fn unevaluate_invalidates_queries() {
        let mut it = InteractionType::new(spatial_config()).unwrap();
        let sp = subpop(1, &[0.0, 1.0]);
        it.evaluate([&sp], false).unwrap();
        assert!(it.distance(&sp, &[0], None).is_ok());

        it.unevaluate();
        match it.distance(&sp, &[0], None) {
            Err(QueryError::NotEvaluated { .. }) => {}
            other => panic!("expected NotEvaluated, got {other:?}"),
        }
    }

    #[test]
    fn reevaluation_after_size_change_stays_consistent() {
        // Matrix buffers are retained across unevaluate(); a subsequent
        // evaluation of a differently-sized subpopulation must resize and
        // re-initialize them.
        let mut it = InteractionType::new(spatial_config()).unwrap();
        let sp = subpop(1, &[0.0, 1.0, 3.0]);
        it.evaluate([&sp], true).unwrap();
        assert_eq!(
            it.distance(&sp, &[0], None).unwrap(),
            vec![0.0, 1.0, 3.0],
        );

        it.unevaluate();
        let smaller = subpop(1, &[0.0, 2.0]);
        it.evaluate([&smaller], false).unwrap();
        assert_eq!(it.distance(&smaller, &[0], None).unwrap(), vec![0.0, 2.0]);
        assert_eq!(
            it.strength(&smaller, &[1], None).unwrap(),
            vec![1.0, 0.0],
            "fixed strength 1 within range, 0 on the diagonal"
        );
    }

    #[test]
    fn stale_subpopulation_view_is_rejected() {
        let mut it = InteractionType::new(spatial_config()).unwrap();
        let sp = subpop(1, &[0.0, 1.0]);
        it.evaluate([&sp], false).unwrap();

        // Same id, different size: the host mutated without re-evaluating.
        let grown = subpop(1, &[0.0, 1.0, 2.0]);
        match it.distance(&grown, &[0], None) {
            Err(QueryError::NotEvaluated { .. }) => {}
            other => panic!("expected NotEvaluated, got {other:?}"),
        }
    }

    #[test]
    fn periodic_extent_must_exceed_twice_max_distance() {
        let mut it = InteractionType::new(InteractionConfig {
            spatiality: Spatiality::X,
            max_distance: 5.0,
            periodicity: Periodicity {
                x: true,
                y: false,
                z: false,
            },
            ..InteractionConfig::default()
        })
        .unwrap();
        // Extent 10 with max_distance 5: bound <= 2 * max, refused.
        let sp = subpop(1, &[0.0, 1.0]);
        match it.evaluate([&sp], false) {
            Err(EvaluateError::MaxDistanceExceedsPeriodicBounds { axis: 'x', .. }) => {}
            other => panic!("expected MaxDistanceExceedsPeriodicBounds, got {other:?}"),
        }
        assert!(!it.any_evaluated());
    }

    #[test]
    fn evaluate_rejects_out_of_periodic_bounds_position() {
        let mut it = InteractionType::new(InteractionConfig {
            spatiality: Spatiality::X,
            max_distance: 2.0,
            periodicity: Periodicity {
                x: true,
                y: false,
                z: false,
            },
            ..InteractionConfig::default()
        })
        .unwrap();
        let sp = subpop(1, &[0.0, 12.5]);
        match it.evaluate([&sp], false) {
            Err(EvaluateError::OutOfPeriodicBounds {
                individual: 1,
                axis: 'x',
                ..
            }) => {}
            other => panic!("expected OutOfPeriodicBounds, got {other:?}"),
        }
    }

    #[test]
    fn metrics_track_lifecycle_events() {
        let mut it = InteractionType::new(spatial_config()).unwrap();
        let sp = subpop(1, &[0.0, 1.0]);
        it.evaluate([&sp], true).unwrap();
        it.unevaluate();
        it.evaluate([&sp], false).unwrap();

        let m = it.metrics();
        assert_eq!(m.evaluations, 2);
        assert_eq!(m.immediate_fills, 1);
        assert_eq!(m.invalidations, 1);
    }
}
