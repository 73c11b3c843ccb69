//! Balanced k-d tree for neighbor searches over position snapshots.
//!
//! The tree is arena-allocated: nodes live in one flat `Vec`, linked by
//! index, so there are no pointer cycles and drop is trivial. Construction
//! uses quickselect median finding at each level for a balanced tree, with
//! the split axis cycling through the packed dimensions as depth
//! increases.
//!
//! # Periodic replication
//!
//! When `p` packed dimensions wrap, [`KdTree::build`] inserts 3^p
//! replicates of every individual, one per offset vector in
//! `{-B, 0, +B}^p`. A query anywhere in the primary box then finds
//! neighbors across wrap boundaries with no case analysis, at a constant
//! factor in tree size. The same individual index appears on up to 3^p
//! nodes; radius-limited queries only ever emit the canonical image
//! (the one within the maximum interaction distance), provided the engine
//! maintains `max_distance < bound / 2` on every periodic axis.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod query;
pub mod tree;

pub use query::NeighborHit;
pub use tree::KdTree;
