//! Test utilities and canned fixtures for cline development.
//!
//! Subpopulation builders plus three standard strength callbacks used
//! across the workspace's tests:
//!
//! - [`ConstantCallback`] — a constant expression, eligible for the
//!   engine's fold-without-invoking short circuit.
//! - [`DistanceThresholdCallback`] — genuinely distance-dependent, so it
//!   must be invoked per pair.
//! - [`MisbehavingCallback`] — returns a configurable illegal value, for
//!   exercising callback-return errors.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    line_subpop, planar_subpop, ConstantCallback, CountingCallback, DistanceThresholdCallback,
    MisbehavingCallback,
};
