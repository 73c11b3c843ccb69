//! The cline interaction engine.
//!
//! [`InteractionType`] owns the per-subpopulation evaluation caches and
//! exposes the full query surface: pairwise distances and strengths,
//! nearest-neighbor searches, strength totals over neighborhoods, and
//! weighted draws. The host drives the lifecycle: `evaluate()` once per
//! generation, queries at will, `unevaluate()` at the boundary.
//!
//! Single-threaded by design: queries memoize into shared matrices, pair
//! enumeration order is deterministic, and there are no internal locks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod aggregate;
mod data;
mod fill;
mod queries;

pub mod function;
pub mod interaction;
pub mod metrics;

pub use function::InteractionFunction;
pub use interaction::{InteractionConfig, InteractionType};
pub use metrics::InteractionMetrics;
