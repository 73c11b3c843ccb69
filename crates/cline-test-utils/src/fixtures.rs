//! Subpopulation builders and standard strength callbacks.

use cline_core::{
    CallbackContext, Individual, SpatialBounds, StrengthCallback, SubpopId, Subpopulation,
};
use std::cell::Cell;

/// A subpopulation strung along the x axis at the given coordinates,
/// with no males and cubic bounds sized to the given extent.
pub fn line_subpop(id: u32, xs: &[f64], extent: f64) -> Subpopulation {
    Subpopulation {
        id: SubpopId(id),
        first_male_index: xs.len(),
        bounds: SpatialBounds::cubic(extent),
        individuals: xs.iter().map(|&x| Individual::at(x, 0.0, 0.0)).collect(),
    }
}

/// A subpopulation at explicit (x, y) positions with z = 0.
///
/// `first_male_index` splits the list females-first, as the engine's sex
/// masks expect.
pub fn planar_subpop(
    id: u32,
    positions: &[(f64, f64)],
    first_male_index: usize,
    extent: f64,
) -> Subpopulation {
    Subpopulation {
        id: SubpopId(id),
        first_male_index,
        bounds: SpatialBounds::cubic(extent),
        individuals: positions
            .iter()
            .map(|&(x, y)| Individual::at(x, y, 0.0))
            .collect(),
    }
}

/// A constant-expression callback: always returns the same value, and
/// says so, making it eligible for the engine's constant fold.
pub struct ConstantCallback {
    pub value: f64,
}

impl ConstantCallback {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl StrengthCallback for ConstantCallback {
    fn name(&self) -> &str {
        "constant"
    }

    fn constant_value(&self) -> Option<f64> {
        Some(self.value)
    }

    fn modify(&self, _ctx: &CallbackContext<'_>) -> f64 {
        // The engine folds the constant; reaching here means it did not.
        panic!("constant callback was invoked instead of folded");
    }
}

/// A distance-dependent callback: strength 0 beyond the cutoff, 1 within.
/// Cannot be folded, so the engine must invoke it for every pair.
pub struct DistanceThresholdCallback {
    pub cutoff: f64,
}

impl DistanceThresholdCallback {
    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }
}

impl StrengthCallback for DistanceThresholdCallback {
    fn name(&self) -> &str {
        "distance_threshold"
    }

    fn modify(&self, ctx: &CallbackContext<'_>) -> f64 {
        if ctx.distance > self.cutoff {
            0.0
        } else {
            1.0
        }
    }
}

/// Returns a configurable (typically illegal) value for every pair, for
/// exercising the callback-return error path.
pub struct MisbehavingCallback {
    pub value: f64,
}

impl MisbehavingCallback {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl StrengthCallback for MisbehavingCallback {
    fn name(&self) -> &str {
        "misbehaving"
    }

    fn modify(&self, _ctx: &CallbackContext<'_>) -> f64 {
        self.value
    }
}

/// Passes the running strength through unchanged while counting
/// invocations, for asserting memoization behavior.
pub struct CountingCallback {
    calls: Cell<u64>,
}

impl CountingCallback {
    pub fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }

    /// How many pairs this callback has been invoked for.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }
}

impl Default for CountingCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl StrengthCallback for CountingCallback {
    fn name(&self) -> &str {
        "counting"
    }

    fn modify(&self, ctx: &CallbackContext<'_>) -> f64 {
        self.calls.set(self.calls.get() + 1);
        ctx.strength
    }
}
