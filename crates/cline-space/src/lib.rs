//! Spatial foundations for the cline interaction engine.
//!
//! This crate defines [`Spatiality`] — which of the universe's x/y/z
//! coordinates participate in distance computation — along with the
//! position snapshot taken at evaluation time and the distance kernels
//! used everywhere downstream.
//!
//! # Packed coordinates
//!
//! [`PositionSnapshot::capture`] is the single place where the original
//! identity of the chosen axes matters. It copies the chosen coordinates
//! into a stride-3 buffer, packed from slot 0 regardless of which axes
//! they came from. Everything downstream branches only on the integer
//! dimension count and on packed periodicity flags.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod distance;
pub mod periodic;
pub mod snapshot;
pub mod spatiality;

pub use distance::{dist_sq, euclidean, minimum_image};
pub use periodic::Periodicity;
pub use snapshot::PositionSnapshot;
pub use spatiality::Spatiality;

/// Stride of the packed position buffer: room for three coordinates per
/// individual regardless of spatiality, so index arithmetic never depends
/// on the dimension count.
pub const POSITION_STRIDE: usize = 3;
