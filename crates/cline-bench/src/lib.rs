//! Benchmark-only crate; see the `benches/` directory.
//!
//! Shared helpers for constructing benchmark populations live here so
//! the individual bench files stay small.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use cline_core::{Individual, SpatialBounds, SubpopId, Subpopulation};

/// A deterministic pseudo-random subpopulation in a square box, using a
/// splitmix-style hash so the benches need no RNG dependency at build
/// time.
pub fn scattered_subpop(n: usize, extent: f64) -> Subpopulation {
    let coord = |i: u64, salt: u64| -> f64 {
        let mut z = i.wrapping_add(salt).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        (z as f64 / u64::MAX as f64) * extent
    };
    Subpopulation {
        id: SubpopId(1),
        first_male_index: n,
        bounds: SpatialBounds::cubic(extent),
        individuals: (0..n as u64)
            .map(|i| Individual::at(coord(i, 1), coord(i, 2), 0.0))
            .collect(),
    }
}
