//! Core types and traits for the cline spatial interaction engine.
//!
//! This is the leaf crate with zero internal cline dependencies. It defines
//! the fundamental abstractions used throughout the workspace: typed IDs,
//! the host-facing subpopulation view, error types, and the strength
//! callback trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod callback;
pub mod error;
pub mod id;
pub mod subpop;

// Re-export core types at crate root for convenience.
pub use callback::{CallbackContext, StrengthCallback};
pub use error::{CallbackError, ConfigError, EvaluateError, QueryError};
pub use id::SubpopId;
pub use subpop::{Individual, SexSpec, SpatialBounds, Subpopulation};
