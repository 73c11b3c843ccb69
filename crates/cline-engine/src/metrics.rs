//! Cumulative counters for engine activity.

/// Counters accumulated over the lifetime of one [`InteractionType`].
///
/// Populated as evaluations and queries run; consumers (telemetry, tests,
/// profiling) read them at any point. Counters are never reset by the
/// engine, not even by `unevaluate()`.
///
/// [`InteractionType`]: crate::InteractionType
#[derive(Clone, Debug, Default)]
pub struct InteractionMetrics {
    /// Number of subpopulation evaluations performed.
    pub evaluations: u64,
    /// Evaluations that eagerly filled the full matrices.
    pub immediate_fills: u64,
    /// Number of k-d trees constructed.
    pub tree_builds: u64,
    /// Pair strengths computed through the kernel (cache misses).
    pub strengths_computed: u64,
    /// Weighted draws performed by `draw_by_strength`.
    pub draws: u64,
    /// Invalidations via `unevaluate()`.
    pub invalidations: u64,
}
