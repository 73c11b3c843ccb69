//! The strength-modifier callback trait.
//!
//! Hosts register callbacks on an interaction type; the engine snapshots
//! the registered set at evaluation time and invokes it whenever a pair
//! strength is first computed. Callbacks chain left-to-right: each sees
//! the running strength and returns a replacement.

use crate::id::SubpopId;
use crate::subpop::Individual;

/// Everything a callback may inspect for one pair-strength computation.
///
/// The receiver/exerter are exposed by subpopulation-local index along
/// with the individual slice, so callbacks can read coordinates without
/// the engine owning host state. This context is built once per kernel
/// invocation and passed down the aggregation recursion explicitly; there
/// is no ambient global state.
#[derive(Clone, Copy, Debug)]
pub struct CallbackContext<'a> {
    /// Distance between the pair, or NaN for non-spatial interactions.
    pub distance: f64,
    /// The running strength entering this callback.
    pub strength: f64,
    /// Subpopulation-local index of the receiving individual.
    pub receiver: usize,
    /// Subpopulation-local index of the exerting individual.
    pub exerter: usize,
    /// The subpopulation both individuals belong to.
    pub subpop: SubpopId,
    /// The subpopulation's individuals, indexable by `receiver`/`exerter`.
    pub individuals: &'a [Individual],
}

/// A host-supplied modifier of interaction strength.
///
/// Implementations must be pure with respect to the evaluation lifetime:
/// for a given pair and distance, `modify` must return the same value
/// until the interaction is re-evaluated, because the engine memoizes
/// results in its strength matrix and will not call back for a cached
/// pair.
pub trait StrengthCallback {
    /// Name used in error messages when a return value is rejected.
    fn name(&self) -> &str;

    /// Constant-expression short-circuit.
    ///
    /// A callback whose body is a constant (for instance `{ return 1.1; }`
    /// in a scripted host) may report that constant here; the engine then
    /// replaces the running strength with it without calling [`modify`]
    /// at all. Return `None` (the default) for anything
    /// distance- or individual-dependent. This is an optimization only;
    /// the observable contract is unchanged.
    ///
    /// [`modify`]: StrengthCallback::modify
    fn constant_value(&self) -> Option<f64> {
        None
    }

    /// Compute the replacement strength for one pair.
    ///
    /// The return value must be finite and non-negative; anything else
    /// surfaces as a `CallbackReturn` error carrying [`name`] and unwinds
    /// the running query.
    ///
    /// [`name`]: StrengthCallback::name
    fn modify(&self, ctx: &CallbackContext<'_>) -> f64;
}
