//! cline: the spatial interaction engine of an individual-based
//! forward-time population simulator.
//!
//! This is the top-level facade crate re-exporting the public API from
//! the cline sub-crates. For most hosts, adding `cline` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cline::prelude::*;
//!
//! // Four individuals on a line, no sexes.
//! let subpop = Subpopulation {
//!     id: SubpopId(1),
//!     first_male_index: 4,
//!     bounds: SpatialBounds::cubic(10.0),
//!     individuals: vec![
//!         Individual::at(0.0, 0.0, 0.0),
//!         Individual::at(1.0, 0.0, 0.0),
//!         Individual::at(2.0, 0.0, 0.0),
//!         Individual::at(5.0, 0.0, 0.0),
//!     ],
//! };
//!
//! // A 1-D interaction along x with linear falloff over distance 2.
//! let mut interaction = InteractionType::new(InteractionConfig {
//!     spatiality: "x".parse().unwrap(),
//!     max_distance: 2.0,
//!     ..InteractionConfig::default()
//! })
//! .unwrap();
//! interaction
//!     .set_interaction_function(InteractionFunction::Linear { strength: 1.0 })
//!     .unwrap();
//!
//! interaction.evaluate([&subpop], false).unwrap();
//! let row = interaction.distance(&subpop, &[0], None).unwrap();
//! assert_eq!(row, vec![0.0, 1.0, 2.0, 5.0]);
//!
//! let strengths = interaction.strength(&subpop, &[0], None).unwrap();
//! assert_eq!(strengths, vec![0.0, 0.5, 0.0, 0.0]);
//!
//! interaction.unevaluate();
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cline-core` | IDs, the subpopulation view, errors, the callback trait |
//! | [`space`] | `cline-space` | Spatiality, periodicity, snapshots, distance kernels |
//! | [`kdtree`] | `cline-kdtree` | The neighbor-search tree |
//! | [`engine`] | `cline-engine` | `InteractionType` and the query surface |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, errors, and the callback trait (`cline-core`).
pub use cline_core as types;

/// Spatiality, snapshots, and distance kernels (`cline-space`).
pub use cline_space as space;

/// The neighbor-search k-d tree (`cline-kdtree`).
pub use cline_kdtree as kdtree;

/// The interaction engine and query surface (`cline-engine`).
pub use cline_engine as engine;

/// Common imports for typical cline usage.
///
/// ```rust
/// use cline::prelude::*;
/// ```
pub mod prelude {
    // Host data model
    pub use cline_core::{Individual, SexSpec, SpatialBounds, SubpopId, Subpopulation};

    // Callbacks
    pub use cline_core::{CallbackContext, StrengthCallback};

    // Errors
    pub use cline_core::{CallbackError, ConfigError, EvaluateError, QueryError};

    // Space
    pub use cline_space::{Periodicity, Spatiality};

    // Engine
    pub use cline_engine::{
        InteractionConfig, InteractionFunction, InteractionMetrics, InteractionType,
    };
}
