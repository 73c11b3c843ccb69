//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a subpopulation within the host simulation.
///
/// The host assigns these; the engine only uses them as keys into its
/// per-subpopulation evaluation caches. IDs are stable for the lifetime
/// of the simulation even as subpopulations change size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubpopId(pub u32);

impl fmt::Display for SubpopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl From<u32> for SubpopId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
